// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared predictor: one immutable [`TransitionModel`] snapshot, swapped
//! wholesale on every training pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use affect_compress::QuantizedSymbol;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accuracy::{AccuracyWindow, DEFAULT_PREDICTION_WINDOW};
use crate::history::{TrainingHistory, DEFAULT_HISTORY_CAPACITY};
use crate::model::{Prediction, TrainingSequence, TransitionModel};

/// Configuration for the shared predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Training sequences retained (oldest evicted first).
    pub history_capacity: usize,
    /// Outcomes in the rolling accuracy window.
    pub prediction_window: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            prediction_window: DEFAULT_PREDICTION_WINDOW,
        }
    }
}

impl PredictorConfig {
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_prediction_window(mut self, window: usize) -> Self {
        self.prediction_window = window;
        self
    }
}

/// Point-in-time view of predictor quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictorStats {
    pub generation: u64,
    pub sequences: usize,
    pub transitions: u64,
    pub accuracy: Option<f32>,
    pub window_len: usize,
    pub observed: u64,
    /// Outcomes skipped because the window was busy.
    pub dropped_outcomes: u64,
}

/// Transition predictor shared across sessions.
///
/// `predict` clones the current model `Arc` and releases the lock, so a
/// concurrent `train` only ever swaps in a fully built model.
pub struct SequencePredictor {
    config: PredictorConfig,
    model: RwLock<Arc<TransitionModel>>,
    train_lock: Mutex<()>,
    history: Mutex<TrainingHistory>,
    accuracy: Mutex<AccuracyWindow>,
    generation: AtomicU64,
    dropped_outcomes: AtomicU64,
}

impl Default for SequencePredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl std::fmt::Debug for SequencePredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencePredictor")
            .field("config", &self.config)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl SequencePredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            model: RwLock::new(Arc::new(TransitionModel::empty())),
            train_lock: Mutex::new(()),
            history: Mutex::new(TrainingHistory::new(config.history_capacity)),
            accuracy: Mutex::new(AccuracyWindow::new(config.prediction_window)),
            generation: AtomicU64::new(0),
            dropped_outcomes: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> PredictorConfig {
        self.config
    }

    /// Current model snapshot.
    pub fn model(&self) -> Arc<TransitionModel> {
        self.model.read().clone()
    }

    /// Number of completed training passes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn predict(&self, current: QuantizedSymbol) -> Prediction {
        self.model().predict(current)
    }

    /// Rebuild the model from `histories` alone and swap it in.
    pub fn train(&self, histories: &[TrainingSequence]) -> Arc<TransitionModel> {
        let _guard = self.train_lock.lock();
        self.install(TransitionModel::build(histories))
    }

    /// Admit `sequence` into the bounded history, then retrain from the whole
    /// history. Returns the number of sequences evicted to make room.
    pub fn admit_and_retrain(&self, sequence: TrainingSequence) -> usize {
        let _guard = self.train_lock.lock();
        let mut history = self.history.lock();
        let evicted = history.admit(sequence).len();
        let model = TransitionModel::build(history.as_slice());
        drop(history);
        self.install(model);
        evicted
    }

    /// Seed the history with sequences loaded by a collaborator and retrain.
    pub fn load_history<I>(&self, sequences: I)
    where
        I: IntoIterator<Item = TrainingSequence>,
    {
        let _guard = self.train_lock.lock();
        let mut history = self.history.lock();
        for sequence in sequences {
            history.admit(sequence);
        }
        let model = TransitionModel::build(history.as_slice());
        drop(history);
        self.install(model);
    }

    /// Copy of the retained history, oldest first.
    pub fn history_snapshot(&self) -> Vec<TrainingSequence> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Feed one prediction outcome into the rolling window.
    ///
    /// Never waits: if the window is busy the outcome is dropped and counted.
    /// Returns whether it was recorded.
    pub fn record_outcome(&self, predicted: QuantizedSymbol, actual: QuantizedSymbol) -> bool {
        if let Some(mut window) = self.accuracy.try_lock() {
            window.record(predicted == actual);
            true
        } else {
            self.dropped_outcomes.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Rolling accuracy, `None` before any outcome was recorded.
    pub fn accuracy(&self) -> Option<f32> {
        self.accuracy.lock().accuracy()
    }

    pub fn stats(&self) -> PredictorStats {
        let model = self.model();
        let window = self.accuracy.lock();
        PredictorStats {
            generation: self.generation(),
            sequences: model.sequence_count(),
            transitions: model.transition_count(),
            accuracy: window.accuracy(),
            window_len: window.len(),
            observed: window.observed(),
            dropped_outcomes: self.dropped_outcomes.load(Ordering::Relaxed),
        }
    }

    fn install(&self, model: TransitionModel) -> Arc<TransitionModel> {
        let model = Arc::new(model);
        *self.model.write() = Arc::clone(&model);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            generation,
            sequences = model.sequence_count(),
            transitions = model.transition_count(),
            "transition model retrained"
        );
        model
    }
}
