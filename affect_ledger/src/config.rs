// SPDX-License-Identifier: MIT OR Apache-2.0
use affect_compress::{Quantizer, DEFAULT_BUCKETS, DEFAULT_SCALE};
use affect_predict::{PredictorConfig, DEFAULT_HISTORY_CAPACITY, DEFAULT_PREDICTION_WINDOW};
use affect_vault::AuditKey;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Default weight of the compression ratio in the efficiency score.
pub const DEFAULT_RATIO_WEIGHT: f32 = 0.8;

/// Configuration for a storage session.
///
/// `cost_per_byte_period` has no sensible default and is taken by
/// [`SessionConfig::new`]; everything else can be overridden with the
/// `with_*` builders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Multiplier applied to sample values before delta coding.
    pub scale_factor: f32,
    /// Buckets used to quantize samples into symbols.
    pub quantization_buckets: u16,
    /// Training sequences retained by the predictor.
    pub history_capacity: usize,
    /// Outcomes in the predictor's rolling accuracy window.
    pub prediction_window: usize,
    /// Storage cost of one byte for one retention period.
    pub cost_per_byte_period: f64,
    /// Weight of the ratio term in the efficiency score, in `[0, 1]`.
    pub ratio_weight: f32,
    /// Periods the sealed blob is expected to be retained.
    pub retention_periods: u32,
    /// Whether owner accesses are written to the audit log.
    pub log_owner_access: bool,
    /// Keys the audit chain when set. Never serialized.
    #[serde(skip)]
    pub audit_key: Option<AuditKey>,
}

impl SessionConfig {
    pub fn new(cost_per_byte_period: f64) -> Self {
        Self {
            scale_factor: DEFAULT_SCALE,
            quantization_buckets: DEFAULT_BUCKETS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            prediction_window: DEFAULT_PREDICTION_WINDOW,
            cost_per_byte_period,
            ratio_weight: DEFAULT_RATIO_WEIGHT,
            retention_periods: 1,
            log_owner_access: true,
            audit_key: None,
        }
    }

    pub fn with_scale_factor(mut self, scale: f32) -> Self {
        self.scale_factor = scale;
        self
    }

    pub fn with_quantization_buckets(mut self, buckets: u16) -> Self {
        self.quantization_buckets = buckets;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_prediction_window(mut self, window: usize) -> Self {
        self.prediction_window = window;
        self
    }

    pub fn with_ratio_weight(mut self, weight: f32) -> Self {
        self.ratio_weight = weight;
        self
    }

    pub fn with_retention_periods(mut self, periods: u32) -> Self {
        self.retention_periods = periods;
        self
    }

    pub fn with_owner_logging(mut self, enabled: bool) -> Self {
        self.log_owner_access = enabled;
        self
    }

    pub fn with_audit_key(mut self, key: AuditKey) -> Self {
        self.audit_key = Some(key);
        self
    }

    /// Predictor settings derived from this config. A session only accepts
    /// a shared predictor built with exactly these settings.
    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig::default()
            .with_history_capacity(self.history_capacity)
            .with_prediction_window(self.prediction_window)
    }

    /// # Errors
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(SessionError::InvalidConfig(format!(
                "scale_factor must be finite and positive, got {}",
                self.scale_factor
            )));
        }
        if let Err(e) = Quantizer::new(self.quantization_buckets) {
            return Err(SessionError::InvalidConfig(e.to_string()));
        }
        if !self.cost_per_byte_period.is_finite() || self.cost_per_byte_period < 0.0 {
            return Err(SessionError::InvalidConfig(format!(
                "cost_per_byte_period must be finite and non-negative, got {}",
                self.cost_per_byte_period
            )));
        }
        if !(0.0..=1.0).contains(&self.ratio_weight) {
            return Err(SessionError::InvalidConfig(format!(
                "ratio_weight must be within [0, 1], got {}",
                self.ratio_weight
            )));
        }
        Ok(())
    }
}
