// SPDX-License-Identifier: MIT OR Apache-2.0
//! Run-length encoding for quantized symbol streams.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Longest run a single segment can carry.
pub const MAX_RUN: u16 = u16::MAX;

/// A run of identical symbols.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RleSegment {
    pub value: u8,
    pub count: u16,
}

impl RleSegment {
    #[must_use]
    pub const fn new(value: u8, count: u16) -> Self {
        Self { value, count }
    }
}

/// Incremental run-length encoder.
///
/// Runs are tracked without an upper bound; on flush a run longer than
/// [`MAX_RUN`] is split into consecutive segments carrying the same value.
#[derive(Debug, Clone, Default)]
pub struct RleEncoder {
    current: Option<(u8, u64)>,
    segments: Vec<RleSegment>,
}

impl RleEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: u8) {
        match &mut self.current {
            Some((value, count)) if *value == symbol => *count += 1,
            _ => {
                self.flush();
                self.current = Some((symbol, 1));
            },
        }
    }

    /// Number of symbols pushed so far.
    #[must_use]
    pub fn len(&self) -> u64 {
        let flushed: u64 = self.segments.iter().map(|s| u64::from(s.count)).sum();
        flushed + self.current.map_or(0, |(_, count)| count)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.segments.is_empty()
    }

    /// Segments flushed so far, excluding the pending run.
    #[must_use]
    pub fn segments(&self) -> &[RleSegment] {
        &self.segments
    }

    /// Flush the pending run and return every segment.
    #[must_use]
    pub fn finish(mut self) -> Vec<RleSegment> {
        self.flush();
        self.segments
    }

    fn flush(&mut self) {
        let Some((value, mut remaining)) = self.current.take() else {
            return;
        };
        let cap = u64::from(MAX_RUN);
        while remaining > cap {
            self.segments.push(RleSegment::new(value, MAX_RUN));
            remaining -= cap;
        }
        #[allow(clippy::cast_possible_truncation)]
        self.segments.push(RleSegment::new(value, remaining as u16));
    }
}

/// RLE-encode a slice of symbols.
#[must_use]
pub fn rle_encode(data: &[u8]) -> Vec<RleSegment> {
    let mut encoder = RleEncoder::new();
    for &symbol in data {
        encoder.push(symbol);
    }
    encoder.finish()
}

/// Total number of symbols the segments expand to.
#[must_use]
pub fn decoded_len(segments: &[RleSegment]) -> usize {
    segments.iter().map(|s| usize::from(s.count)).sum()
}

/// Decode RLE back to the original symbols.
#[must_use]
pub fn rle_decode(segments: &[RleSegment]) -> Vec<u8> {
    let mut result = Vec::with_capacity(decoded_len(segments));
    for segment in segments {
        result.extend(std::iter::repeat(segment.value).take(usize::from(segment.count)));
    }
    result
}

/// Verify that `segments` could have been produced by [`RleEncoder`].
///
/// Adjacent equal values are only allowed after a segment saturated at
/// [`MAX_RUN`]; zero-length segments are never produced.
///
/// # Errors
/// Returns `CorruptSegments` naming the offending segment index.
pub fn check_segments(segments: &[RleSegment]) -> Result<()> {
    for (i, segment) in segments.iter().enumerate() {
        if segment.count == 0 {
            return Err(CodecError::CorruptSegments(format!("empty run at segment {i}")));
        }
        if i > 0 {
            let prev = segments[i - 1];
            if prev.value == segment.value && prev.count != MAX_RUN {
                return Err(CodecError::CorruptSegments(format!(
                    "unmerged run at segment {i}"
                )));
            }
        }
    }
    Ok(())
}
