// SPDX-License-Identifier: MIT OR Apache-2.0
use std::collections::VecDeque;

/// Default number of outcomes in the rolling window.
pub const DEFAULT_PREDICTION_WINDOW: usize = 100;

/// Rolling hit ratio over the last `capacity` prediction outcomes.
#[derive(Debug, Clone)]
pub struct AccuracyWindow {
    capacity: usize,
    outcomes: VecDeque<bool>,
    hits: usize,
    observed: u64,
}

impl Default for AccuracyWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PREDICTION_WINDOW)
    }
}

impl AccuracyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            outcomes: VecDeque::with_capacity(capacity.min(4096)),
            hits: 0,
            observed: 0,
        }
    }

    pub fn record(&mut self, hit: bool) {
        self.observed += 1;
        if self.capacity == 0 {
            return;
        }
        if self.outcomes.len() == self.capacity && self.outcomes.pop_front() == Some(true) {
            self.hits -= 1;
        }
        self.outcomes.push_back(hit);
        if hit {
            self.hits += 1;
        }
    }

    /// Hit ratio over the window, `None` until something was recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> Option<f32> {
        if self.outcomes.is_empty() {
            None
        } else {
            Some(self.hits as f32 / self.outcomes.len() as f32)
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcomes recorded since creation, including those rolled out.
    pub fn observed(&self) -> u64 {
        self.observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window() {
        let window = AccuracyWindow::default();
        assert_eq!(window.accuracy(), None);
        assert!(window.is_empty());
    }

    #[test]
    fn test_ratio() {
        let mut window = AccuracyWindow::new(10);
        for hit in [true, true, false, true] {
            window.record(hit);
        }
        assert_eq!(window.accuracy(), Some(0.75));
    }

    #[test]
    fn test_window_rolls() {
        let mut window = AccuracyWindow::new(3);
        for hit in [false, false, false, true, true, true] {
            window.record(hit);
        }
        assert_eq!(window.accuracy(), Some(1.0));
        assert_eq!(window.len(), 3);
        assert_eq!(window.observed(), 6);

        window.record(false);
        assert!((window.accuracy().unwrap() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_capacity() {
        let mut window = AccuracyWindow::new(0);
        window.record(true);
        assert_eq!(window.accuracy(), None);
        assert_eq!(window.observed(), 1);
    }
}
