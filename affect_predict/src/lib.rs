// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence predictor for quantized affect streams.
//!
//! Builds an empirical first-order transition model from the symbol trails of
//! completed sessions and predicts the most likely next symbol. Training is
//! batched (once per sealed session) and always rebuilds from the retained
//! history, since sequences are evicted between passes.
//!
//! Symbols never seen as a predecessor yield the cold-start prediction: the
//! current symbol with zero confidence.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::return_self_not_must_use)]

mod accuracy;
mod history;
mod model;
mod predictor;

pub use accuracy::{AccuracyWindow, DEFAULT_PREDICTION_WINDOW};
pub use history::{TrainingHistory, DEFAULT_HISTORY_CAPACITY};
pub use model::{Prediction, TrainingSequence, TransitionModel};
pub use predictor::{PredictorConfig, PredictorStats, SequencePredictor};
