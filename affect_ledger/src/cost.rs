// SPDX-License-Identifier: MIT OR Apache-2.0
//! Storage cost and compression efficiency accounting.
//!
//! Everything here is a pure function of byte counts, timings and the
//! configured constants.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;

/// Ceiling on the speed component of the efficiency score.
pub const MAX_SPEED_POINTS: f32 = 20.0;

/// Summary of one sealed session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub ratio: f32,
    pub estimated_cost: f64,
    pub encode_duration_ms: u32,
    pub efficiency_score: f32,
}

impl EfficiencyReport {
    /// Bytes saved by compression; zero if the blob grew.
    pub fn bytes_saved(&self) -> u64 {
        self.original_bytes.saturating_sub(self.compressed_bytes)
    }
}

/// `original / compressed`, or `0.0` when nothing was written.
#[allow(clippy::cast_precision_loss)]
pub fn ratio(original_bytes: u64, compressed_bytes: u64) -> f32 {
    if compressed_bytes == 0 {
        0.0
    } else {
        (original_bytes as f64 / compressed_bytes as f64) as f32
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn estimate_cost(size_bytes: u64, retention_periods: u32, cost_per_byte_period: f64) -> f64 {
    size_bytes as f64 * f64::from(retention_periods) * cost_per_byte_period
}

/// Weighted blend of compression ratio and encode speed.
///
/// The speed term is `(1 - ratio_weight) * 1000 / duration_ms`, capped at
/// [`MAX_SPEED_POINTS`]; durations under a millisecond count as one.
#[allow(clippy::cast_precision_loss)]
pub fn efficiency_score(
    original_bytes: u64,
    compressed_bytes: u64,
    duration_ms: u32,
    ratio_weight: f32,
) -> f32 {
    let ratio_points = ratio_weight * ratio(original_bytes, compressed_bytes);
    let speed_points = ((1.0 - ratio_weight) * 1000.0 / duration_ms.max(1) as f32).min(MAX_SPEED_POINTS);
    ratio_points + speed_points
}

/// Cost constants taken from a [`SessionConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub cost_per_byte_period: f64,
    pub retention_periods: u32,
    pub ratio_weight: f32,
}

impl CostModel {
    pub fn new(cost_per_byte_period: f64, retention_periods: u32, ratio_weight: f32) -> Self {
        Self {
            cost_per_byte_period,
            retention_periods,
            ratio_weight,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.cost_per_byte_period,
            config.retention_periods,
            config.ratio_weight,
        )
    }

    pub fn estimate(&self, size_bytes: u64) -> f64 {
        estimate_cost(size_bytes, self.retention_periods, self.cost_per_byte_period)
    }

    pub fn report(
        &self,
        original_bytes: u64,
        compressed_bytes: u64,
        encode_duration_ms: u32,
    ) -> EfficiencyReport {
        EfficiencyReport {
            original_bytes,
            compressed_bytes,
            ratio: ratio(original_bytes, compressed_bytes),
            estimated_cost: self.estimate(compressed_bytes),
            encode_duration_ms,
            efficiency_score: efficiency_score(
                original_bytes,
                compressed_bytes,
                encode_duration_ms,
                self.ratio_weight,
            ),
        }
    }
}
