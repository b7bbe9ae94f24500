// SPDX-License-Identifier: MIT OR Apache-2.0
//! Delta encoding for scalar samples and sample timestamps.
//!
//! Samples are scaled to fixed-point, then emitted as 16-bit differences from
//! the previous scaled value. Timestamps use zigzag varint deltas so that
//! out-of-order acquisition clocks still round-trip.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Default fixed-point scale: three decimal places.
pub const DEFAULT_SCALE: f32 = 1000.0;

/// Running reference value shared by an encoder/decoder pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaCodecState {
    pub last_value: i16,
}

/// Stateful sample encoder. Output is only decodable, in the same order, by a
/// [`DeltaDecoder`] with the same scale and a freshly reset state.
#[derive(Debug, Clone)]
pub struct DeltaEncoder {
    scale: f32,
    state: DeltaCodecState,
}

impl DeltaEncoder {
    /// `scale` must be finite and positive; callers validate configuration.
    #[must_use]
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            state: DeltaCodecState::default(),
        }
    }

    #[must_use]
    pub const fn scale(&self) -> f32 {
        self.scale
    }

    #[must_use]
    pub const fn state(&self) -> DeltaCodecState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = DeltaCodecState::default();
    }

    /// Encode one sample as a delta from the previous one.
    ///
    /// State is left untouched on error.
    ///
    /// # Errors
    /// `NonFinite` for NaN/infinite input, `Overflow` if the scaled value or
    /// the delta does not fit in an `i16`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&mut self, value: f32) -> Result<i16> {
        if !value.is_finite() {
            return Err(CodecError::NonFinite);
        }

        let previous = self.state.last_value;
        let scaled = (f64::from(value) * f64::from(self.scale)).round();
        if scaled < f64::from(i16::MIN) || scaled > f64::from(i16::MAX) {
            return Err(CodecError::Overflow {
                previous: i64::from(previous),
                next: scaled as i64,
            });
        }

        let scaled = scaled as i16;
        let delta = i32::from(scaled) - i32::from(previous);
        let delta = i16::try_from(delta).map_err(|_| CodecError::Overflow {
            previous: i64::from(previous),
            next: i64::from(scaled),
        })?;

        self.state.last_value = scaled;
        Ok(delta)
    }
}

/// Stateful sample decoder, the mirror of [`DeltaEncoder`].
#[derive(Debug, Clone)]
pub struct DeltaDecoder {
    scale: f32,
    state: DeltaCodecState,
}

impl DeltaDecoder {
    #[must_use]
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            state: DeltaCodecState::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> DeltaCodecState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = DeltaCodecState::default();
    }

    /// # Errors
    /// `Overflow` if the running value leaves the `i16` range, which only
    /// happens for streams that were not produced by a [`DeltaEncoder`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(&mut self, delta: i16) -> Result<f32> {
        let previous = self.state.last_value;
        let next = previous
            .checked_add(delta)
            .ok_or(CodecError::Overflow {
                previous: i64::from(previous),
                next: i64::from(previous) + i64::from(delta),
            })?;
        self.state.last_value = next;
        Ok((f64::from(next) / f64::from(self.scale)) as f32)
    }
}

/// Encode a whole slice with a fresh encoder.
///
/// # Errors
/// Propagates the first [`DeltaEncoder::encode`] failure.
pub fn encode_all(values: &[f32], scale: f32) -> Result<Vec<i16>> {
    let mut encoder = DeltaEncoder::new(scale);
    values.iter().map(|&v| encoder.encode(v)).collect()
}

/// Decode a whole slice with a fresh decoder.
///
/// # Errors
/// Propagates the first [`DeltaDecoder::decode`] failure.
pub fn decode_all(deltas: &[i16], scale: f32) -> Result<Vec<f32>> {
    let mut decoder = DeltaDecoder::new(scale);
    deltas.iter().map(|&d| decoder.decode(d)).collect()
}

/// Append `value` as an LEB128 varint.
pub fn varint_encode(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    #[allow(clippy::cast_possible_truncation)]
    out.push(value as u8);
}

/// Read one varint starting at `*pos`, advancing `pos` past it.
///
/// # Errors
/// `Truncated` if the input ends mid-varint, `Corrupt` if it exceeds 64 bits.
pub fn varint_decode(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;

    loop {
        let byte = *bytes.get(*pos).ok_or(CodecError::Truncated(*pos))?;
        *pos += 1;

        if shift >= 64 || (shift == 63 && byte > 1) {
            return Err(CodecError::Corrupt("varint exceeds 64 bits".into()));
        }
        value |= u64::from(byte & 0x7f) << shift;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

#[allow(clippy::cast_sign_loss)]
const fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[allow(clippy::cast_possible_wrap)]
const fn unzigzag(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Incremental form of [`encode_timestamps`].
#[derive(Debug, Clone, Default)]
pub struct TimestampEncoder {
    prev: u64,
    count: u64,
    out: Vec<u8>,
}

impl TimestampEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::cast_possible_wrap)]
    pub fn push(&mut self, timestamp: u64) {
        varint_encode(zigzag(timestamp.wrapping_sub(self.prev) as i64), &mut self.out);
        self.prev = timestamp;
        self.count += 1;
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Bytes emitted so far.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.out.len()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// Encode timestamps as zigzag varint deltas from the previous timestamp.
#[must_use]
pub fn encode_timestamps(timestamps: &[u64]) -> Vec<u8> {
    let mut encoder = TimestampEncoder::new();
    for &ts in timestamps {
        encoder.push(ts);
    }
    encoder.finish()
}

/// Decode the output of [`encode_timestamps`].
///
/// # Errors
/// Returns a varint error if `bytes` is truncated or malformed.
#[allow(clippy::cast_sign_loss)]
pub fn decode_timestamps(bytes: &[u8]) -> Result<Vec<u64>> {
    let mut out = Vec::new();
    let mut pos = 0;
    let mut prev = 0u64;
    while pos < bytes.len() {
        let delta = unzigzag(varint_decode(bytes, &mut pos)?);
        prev = prev.wrapping_add(delta as u64);
        out.push(prev);
    }
    Ok(out)
}
