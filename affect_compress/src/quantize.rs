// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bucket quantization of normalized samples into `u8` symbols.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bucket count: `-1.0..=1.0` at 0.01 resolution.
pub const DEFAULT_BUCKETS: u16 = 201;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantizationError {
    #[error("bucket count {0} outside 2..=256")]
    InvalidBuckets(u16),
    #[error("symbol {symbol} outside 0..{buckets}")]
    SymbolOutOfRange { symbol: u8, buckets: u16 },
}

/// Maps `[-1.0, 1.0]` onto `0..buckets` evenly; values outside are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantizer {
    buckets: u16,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
        }
    }
}

impl Quantizer {
    /// # Errors
    /// `InvalidBuckets` unless `2 <= buckets <= 256`.
    pub fn new(buckets: u16) -> Result<Self, QuantizationError> {
        if !(2..=256).contains(&buckets) {
            return Err(QuantizationError::InvalidBuckets(buckets));
        }
        Ok(Self { buckets })
    }

    #[must_use]
    pub const fn buckets(&self) -> u16 {
        self.buckets
    }

    /// Width of one bucket in value space.
    #[must_use]
    pub fn step(&self) -> f32 {
        2.0 / f32::from(self.buckets - 1)
    }

    /// NaN maps to the center bucket.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn quantize(&self, value: f32) -> u8 {
        let value = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
        let top = f32::from(self.buckets - 1);
        ((value + 1.0) / 2.0 * top).round() as u8
    }

    /// # Errors
    /// `SymbolOutOfRange` for symbols this quantizer never produces.
    pub fn dequantize(&self, symbol: u8) -> Result<f32, QuantizationError> {
        if u16::from(symbol) >= self.buckets {
            return Err(QuantizationError::SymbolOutOfRange {
                symbol,
                buckets: self.buckets,
            });
        }
        let top = f32::from(self.buckets - 1);
        Ok(f32::from(symbol) / top * 2.0 - 1.0)
    }
}
