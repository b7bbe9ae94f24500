// SPDX-License-Identifier: MIT OR Apache-2.0
//! Empirical first-order transition model over quantized symbols.

use std::collections::BTreeMap;

use affect_compress::QuantizedSymbol;
use serde::{Deserialize, Serialize};

/// Ordered symbols captured from one completed session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSequence(Vec<QuantizedSymbol>);

impl TrainingSequence {
    #[must_use]
    pub fn new(symbols: Vec<QuantizedSymbol>) -> Self {
        Self(symbols)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[QuantizedSymbol] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of adjacent pairs this sequence contributes.
    #[must_use]
    pub fn transitions(&self) -> usize {
        self.0.len().saturating_sub(1)
    }
}

impl From<Vec<QuantizedSymbol>> for TrainingSequence {
    fn from(symbols: Vec<QuantizedSymbol>) -> Self {
        Self(symbols)
    }
}

impl From<&[QuantizedSymbol]> for TrainingSequence {
    fn from(symbols: &[QuantizedSymbol]) -> Self {
        Self(symbols.to_vec())
    }
}

/// Most likely next symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub symbol: QuantizedSymbol,
    /// Share of observed transitions from the current symbol that went to
    /// `symbol`; `0.0` on cold start.
    pub confidence: f32,
    /// No transitions from the current symbol were ever observed, so the
    /// prediction is the current symbol itself.
    pub cold_start: bool,
}

impl Prediction {
    const fn cold(current: QuantizedSymbol) -> Self {
        Self {
            symbol: current,
            confidence: 0.0,
            cold_start: true,
        }
    }
}

/// Sparse `(prev, next) -> frequency` table. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionModel {
    counts: BTreeMap<QuantizedSymbol, BTreeMap<QuantizedSymbol, u64>>,
    totals: BTreeMap<QuantizedSymbol, u64>,
    sequences: usize,
    transitions: u64,
}

impl TransitionModel {
    /// Model with no observations; every prediction is a cold start.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Count every adjacent pair in every sequence.
    #[must_use]
    pub fn build(histories: &[TrainingSequence]) -> Self {
        let mut model = Self {
            sequences: histories.len(),
            ..Self::default()
        };

        for sequence in histories {
            for pair in sequence.as_slice().windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                *model.counts.entry(prev).or_default().entry(next).or_default() += 1;
                *model.totals.entry(prev).or_default() += 1;
                model.transitions += 1;
            }
        }

        model
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions == 0
    }

    /// Sequences the model was built from.
    #[must_use]
    pub const fn sequence_count(&self) -> usize {
        self.sequences
    }

    /// Total transitions observed.
    #[must_use]
    pub const fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Raw frequency of `prev -> next`.
    #[must_use]
    pub fn frequency(&self, prev: QuantizedSymbol, next: QuantizedSymbol) -> u64 {
        self.counts
            .get(&prev)
            .and_then(|nexts| nexts.get(&next))
            .copied()
            .unwrap_or(0)
    }

    /// Normalized `P(next | prev)`, `0.0` if `prev` was never observed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn probability(&self, prev: QuantizedSymbol, next: QuantizedSymbol) -> f32 {
        match self.totals.get(&prev) {
            Some(&total) if total > 0 => self.frequency(prev, next) as f32 / total as f32,
            _ => 0.0,
        }
    }

    /// Normalized distribution over successors of `prev`, ascending by symbol.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distribution(&self, prev: QuantizedSymbol) -> Vec<(QuantizedSymbol, f32)> {
        let (Some(nexts), Some(&total)) = (self.counts.get(&prev), self.totals.get(&prev)) else {
            return Vec::new();
        };
        nexts
            .iter()
            .map(|(&next, &count)| (next, count as f32 / total as f32))
            .collect()
    }

    /// Argmax successor of `current`. Ties resolve to the smallest symbol.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn predict(&self, current: QuantizedSymbol) -> Prediction {
        let (Some(nexts), Some(&total)) = (self.counts.get(&current), self.totals.get(&current))
        else {
            return Prediction::cold(current);
        };

        let mut best: Option<(QuantizedSymbol, u64)> = None;
        for (&next, &count) in nexts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((next, count));
            }
        }

        match best {
            Some((symbol, count)) if total > 0 => Prediction {
                symbol,
                confidence: count as f32 / total as f32,
                cold_start: false,
            },
            _ => Prediction::cold(current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(symbols: &[u8]) -> TrainingSequence {
        TrainingSequence::from(symbols)
    }

    #[test]
    fn test_empty_model_cold_start() {
        let model = TransitionModel::empty();
        assert!(model.is_empty());
        let p = model.predict(42);
        assert_eq!(p.symbol, 42);
        assert_eq!(p.confidence, 0.0);
        assert!(p.cold_start);
    }

    #[test]
    fn test_degenerate_repeated_symbol() {
        let model = TransitionModel::build(&[seq(&[7; 20]), seq(&[7; 5])]);
        let p = model.predict(7);
        assert_eq!(p.symbol, 7);
        assert_eq!(p.confidence, 1.0);
        assert!(!p.cold_start);
        assert_eq!(model.transition_count(), 23);
    }

    #[test]
    fn test_argmax_and_confidence() {
        // From 1: ->2 three times, ->3 once.
        let model = TransitionModel::build(&[seq(&[1, 2, 1, 2, 1, 3]), seq(&[1, 2])]);
        let p = model.predict(1);
        assert_eq!(p.symbol, 2);
        assert!((p.confidence - 0.75).abs() < 1e-6);
        assert_eq!(model.frequency(1, 3), 1);
        assert!((model.probability(1, 3) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_tie_breaks_to_smallest() {
        let model = TransitionModel::build(&[seq(&[5, 9, 5, 4])]);
        let p = model.predict(5);
        assert_eq!(p.symbol, 4);
        assert!((p.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unseen_symbol_is_cold_even_when_trained() {
        let model = TransitionModel::build(&[seq(&[1, 2, 3])]);
        // 3 only appears as a successor.
        assert!(model.predict(3).cold_start);
        assert!(model.distribution(3).is_empty());
        assert_eq!(model.probability(3, 1), 0.0);
    }

    #[test]
    fn test_distribution_normalized() {
        let model = TransitionModel::build(&[seq(&[0, 1, 0, 2, 0, 2, 0, 3])]);
        let dist = model.distribution(0);
        assert_eq!(dist.iter().map(|(s, _)| *s).collect::<Vec<_>>(), vec![1, 2, 3]);
        let sum: f32 = dist.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_sequences_contribute_nothing() {
        let model = TransitionModel::build(&[seq(&[]), seq(&[4])]);
        assert!(model.is_empty());
        assert_eq!(model.sequence_count(), 2);
    }

    #[test]
    fn test_model_serialize() {
        let model = TransitionModel::build(&[seq(&[1, 1, 2, 3, 1])]);
        let bytes = bincode::serialize(&model).unwrap();
        let restored: TransitionModel = bincode::deserialize(&bytes).unwrap();
        assert_eq!(model, restored);
    }
}
