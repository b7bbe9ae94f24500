// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sealed session record format.
//!
//! A record carries one session's sample stream (varint timestamps plus
//! 16-bit value deltas) and event stream (varint timestamps plus RLE symbol
//! segments) behind a versioned header. It decodes without any predictor or
//! configuration state beyond what the header stores.

use serde::{Deserialize, Serialize};

use crate::delta::{decode_timestamps, DeltaDecoder, DeltaEncoder, TimestampEncoder};
use crate::error::{CodecError, Result};
use crate::rle::{check_segments, decoded_len, rle_decode, RleEncoder, RleSegment};

/// Magic bytes identifying a sealed affect record.
pub const MAGIC: [u8; 4] = *b"AFCT";

/// Current format version.
pub const VERSION: u16 = 1;

/// Uncompressed size of one [`Sample`]: `u64` timestamp + `f32` value.
pub const SAMPLE_WIRE_BYTES: u64 = 12;

/// Uncompressed size of one [`Event`]: `u64` timestamp + `u8` symbol.
pub const EVENT_WIRE_BYTES: u64 = 9;

/// One scalar reading, e.g. valence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub timestamp: u64,
    pub value: f32,
}

impl Sample {
    #[must_use]
    pub const fn new(timestamp: u64, value: f32) -> Self {
        Self { timestamp, value }
    }
}

/// One discrete marker or quantized category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Event {
    pub timestamp: u64,
    pub symbol: u8,
}

impl Event {
    #[must_use]
    pub const fn new(timestamp: u64, symbol: u8) -> Self {
        Self { timestamp, symbol }
    }
}

/// Record header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Header {
    pub magic: [u8; 4],
    pub version: u16,
    pub scale_factor: f32,
    pub quantization_buckets: u16,
    pub sample_count: u64,
    pub event_count: u64,
    /// Time spent encoding, carried so a reopened record reports the same
    /// efficiency as at seal time.
    pub encode_duration_ms: u32,
}

impl Header {
    #[must_use]
    pub const fn new(scale_factor: f32, quantization_buckets: u16) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            scale_factor,
            quantization_buckets,
            sample_count: 0,
            event_count: 0,
            encode_duration_ms: 0,
        }
    }

    /// # Errors
    /// Returns error if magic bytes, version or scale are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(CodecError::InvalidMagic);
        }
        if self.version > VERSION {
            return Err(CodecError::UnsupportedVersion(self.version));
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(CodecError::Corrupt(format!(
                "invalid scale factor {}",
                self.scale_factor
            )));
        }
        Ok(())
    }

    /// Size of the data before compression.
    #[must_use]
    pub const fn original_bytes(&self) -> u64 {
        self.sample_count * SAMPLE_WIRE_BYTES + self.event_count * EVENT_WIRE_BYTES
    }
}

/// Samples and events reconstructed from a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedStreams {
    pub samples: Vec<Sample>,
    pub events: Vec<Event>,
}

/// Complete sealed record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub header: Header,
    pub sample_timestamps: Vec<u8>,
    pub deltas: Vec<i16>,
    pub event_timestamps: Vec<u8>,
    pub segments: Vec<RleSegment>,
}

impl SessionRecord {
    /// # Errors
    /// Returns error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// # Errors
    /// Returns error if deserialization or header validation fails.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let record: Self = bincode::deserialize(bytes)?;
        record.header.validate()?;
        Ok(record)
    }

    /// Expand the record back into its sample and event streams.
    ///
    /// # Errors
    /// Returns `Corrupt` if stream lengths disagree with the header, or a
    /// codec error if any stream fails to decode.
    pub fn decode(&self) -> Result<DecodedStreams> {
        let header = &self.header;
        header.validate()?;

        let sample_ts = decode_timestamps(&self.sample_timestamps)?;
        if sample_ts.len() as u64 != header.sample_count || self.deltas.len() != sample_ts.len() {
            return Err(CodecError::Corrupt(format!(
                "sample count mismatch: header {}, timestamps {}, deltas {}",
                header.sample_count,
                sample_ts.len(),
                self.deltas.len()
            )));
        }

        let event_ts = decode_timestamps(&self.event_timestamps)?;
        check_segments(&self.segments)?;
        if event_ts.len() as u64 != header.event_count || decoded_len(&self.segments) != event_ts.len()
        {
            return Err(CodecError::Corrupt(format!(
                "event count mismatch: header {}, timestamps {}, symbols {}",
                header.event_count,
                event_ts.len(),
                decoded_len(&self.segments)
            )));
        }

        let mut decoder = DeltaDecoder::new(header.scale_factor);
        let samples = sample_ts
            .into_iter()
            .zip(&self.deltas)
            .map(|(timestamp, &delta)| decoder.decode(delta).map(|value| Sample { timestamp, value }))
            .collect::<Result<Vec<_>>>()?;

        let events = event_ts
            .into_iter()
            .zip(rle_decode(&self.segments))
            .map(|(timestamp, symbol)| Event { timestamp, symbol })
            .collect();

        Ok(DecodedStreams { samples, events })
    }
}

/// Routes samples to the delta codec and events to the run-length codec,
/// producing a [`SessionRecord`] on finish.
#[derive(Debug, Clone)]
pub struct RecordEncoder {
    header: Header,
    delta: DeltaEncoder,
    sample_timestamps: TimestampEncoder,
    deltas: Vec<i16>,
    event_timestamps: TimestampEncoder,
    rle: RleEncoder,
}

impl RecordEncoder {
    #[must_use]
    pub fn new(scale_factor: f32, quantization_buckets: u16) -> Self {
        Self {
            header: Header::new(scale_factor, quantization_buckets),
            delta: DeltaEncoder::new(scale_factor),
            sample_timestamps: TimestampEncoder::new(),
            deltas: Vec::new(),
            event_timestamps: TimestampEncoder::new(),
            rle: RleEncoder::new(),
        }
    }

    /// # Errors
    /// Propagates delta codec failures; nothing is recorded on error.
    pub fn push_sample(&mut self, sample: Sample) -> Result<i16> {
        let delta = self.delta.encode(sample.value)?;
        self.sample_timestamps.push(sample.timestamp);
        self.deltas.push(delta);
        Ok(delta)
    }

    pub fn push_event(&mut self, event: Event) {
        self.event_timestamps.push(event.timestamp);
        self.rle.push(event.symbol);
    }

    #[must_use]
    pub const fn sample_count(&self) -> u64 {
        self.sample_timestamps.count()
    }

    #[must_use]
    pub const fn event_count(&self) -> u64 {
        self.event_timestamps.count()
    }

    #[must_use]
    pub fn finish(self, encode_duration_ms: u32) -> SessionRecord {
        let mut header = self.header;
        header.sample_count = self.sample_timestamps.count();
        header.event_count = self.event_timestamps.count();
        header.encode_duration_ms = encode_duration_ms;

        SessionRecord {
            header,
            sample_timestamps: self.sample_timestamps.finish(),
            deltas: self.deltas,
            event_timestamps: self.event_timestamps.finish(),
            segments: self.rle.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SessionRecord {
        let mut encoder = RecordEncoder::new(1000.0, 201);
        for (i, v) in [0.10, 0.12, 0.09].into_iter().enumerate() {
            encoder.push_sample(Sample::new(1_000 + i as u64 * 40, v)).unwrap();
        }
        for (i, s) in [3, 3, 3, 5, 5, 1].into_iter().enumerate() {
            encoder.push_event(Event::new(2_000 + i as u64 * 10, s));
        }
        encoder.finish(4)
    }

    #[test]
    fn test_header_validate_ok() {
        assert!(Header::new(1000.0, 201).validate().is_ok());
    }

    #[test]
    fn test_header_validate_bad_magic() {
        let mut header = Header::new(1000.0, 201);
        header.magic = *b"BAAD";
        assert_eq!(header.validate(), Err(CodecError::InvalidMagic));
    }

    #[test]
    fn test_header_validate_future_version() {
        let mut header = Header::new(1000.0, 201);
        header.version = 999;
        assert_eq!(header.validate(), Err(CodecError::UnsupportedVersion(999)));
    }

    #[test]
    fn test_header_validate_bad_scale() {
        assert!(Header::new(0.0, 201).validate().is_err());
        assert!(Header::new(f32::NAN, 201).validate().is_err());
    }

    #[test]
    fn test_encoder_fills_header() {
        let record = sample_record();
        assert_eq!(record.header.sample_count, 3);
        assert_eq!(record.header.event_count, 6);
        assert_eq!(record.header.encode_duration_ms, 4);
        assert_eq!(record.header.original_bytes(), 3 * 12 + 6 * 9);
        assert_eq!(record.deltas, vec![100, 20, -30]);
        assert_eq!(record.segments.len(), 3);
    }

    #[test]
    fn test_record_decode() {
        let decoded = sample_record().decode().unwrap();
        assert_eq!(decoded.samples.len(), 3);
        assert_eq!(decoded.samples[1].timestamp, 1_040);
        assert!((decoded.samples[2].value - 0.09).abs() <= 0.0005);
        let symbols: Vec<u8> = decoded.events.iter().map(|e| e.symbol).collect();
        assert_eq!(symbols, vec![3, 3, 3, 5, 5, 1]);
        assert_eq!(decoded.events[5].timestamp, 2_050);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let record = sample_record();
        let bytes = record.serialize().unwrap();
        let restored = SessionRecord::deserialize(&bytes).unwrap();
        assert_eq!(record, restored);
    }

    #[test]
    fn test_empty_record() {
        let record = RecordEncoder::new(1000.0, 201).finish(0);
        let bytes = record.serialize().unwrap();
        let decoded = SessionRecord::deserialize(&bytes).unwrap().decode().unwrap();
        assert_eq!(decoded, DecodedStreams::default());
    }

    #[test]
    fn test_deserialize_garbage() {
        assert!(SessionRecord::deserialize(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_deserialize_rejects_bad_magic() {
        let mut record = sample_record();
        record.header.magic = *b"NEUM";
        let bytes = bincode::serialize(&record).unwrap();
        assert_eq!(
            SessionRecord::deserialize(&bytes),
            Err(CodecError::InvalidMagic)
        );
    }

    #[test]
    fn test_decode_detects_count_mismatch() {
        let mut record = sample_record();
        record.deltas.pop();
        assert!(matches!(record.decode(), Err(CodecError::Corrupt(_))));

        let mut record = sample_record();
        record.segments[0].count = 2;
        assert!(matches!(record.decode(), Err(CodecError::Corrupt(_))));
    }

    #[test]
    fn test_decode_rejects_unmerged_segments() {
        let mut record = sample_record();
        record.segments[1].value = 3;
        assert!(matches!(
            record.decode(),
            Err(CodecError::CorruptSegments(_))
        ));
    }

    #[test]
    fn test_failed_push_records_nothing() {
        let mut encoder = RecordEncoder::new(1000.0, 201);
        encoder.push_sample(Sample::new(0, 0.5)).unwrap();
        assert!(encoder.push_sample(Sample::new(1, 50.0)).is_err());
        assert_eq!(encoder.sample_count(), 1);
        let record = encoder.finish(0);
        assert_eq!(record.deltas, vec![500]);
        assert_eq!(record.decode().unwrap().samples.len(), 1);
    }
}
