// SPDX-License-Identifier: MIT OR Apache-2.0
use std::collections::VecDeque;

use crate::model::TrainingSequence;

/// Default number of sequences retained for training.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded FIFO of training sequences.
#[derive(Debug, Clone)]
pub struct TrainingHistory {
    capacity: usize,
    sequences: VecDeque<TrainingSequence>,
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl TrainingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sequences: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Admit a sequence, evicting the oldest first when full.
    /// Returns the evicted sequences, oldest first.
    pub fn admit(&mut self, sequence: TrainingSequence) -> Vec<TrainingSequence> {
        if self.capacity == 0 {
            return vec![sequence];
        }

        let mut evicted = Vec::new();
        while self.sequences.len() >= self.capacity {
            if let Some(oldest) = self.sequences.pop_front() {
                evicted.push(oldest);
            }
        }
        self.sequences.push_back(sequence);
        evicted
    }

    /// Contiguous view, oldest first.
    pub fn as_slice(&mut self) -> &[TrainingSequence] {
        self.sequences.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainingSequence> {
        self.sequences.iter()
    }

    pub fn clear(&mut self) {
        self.sequences.clear();
    }
}
