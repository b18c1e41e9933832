//! Trailing-window smoothing of raw scores.

use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Default number of raw scores averaged.
pub const DEFAULT_WINDOW: usize = 30;

/// Fixed-size FIFO window over raw scores, reporting their mean.
#[derive(Debug, Clone)]
pub struct Smoother {
    window: VecDeque<f64>,
    capacity: usize,
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Smoother {
    /// Create a smoother over the last `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a raw score, evicting the oldest when full, and return the new mean.
    pub fn push(&mut self, raw: f64) -> f64 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(raw);
        self.mean()
    }

    /// Mean of the current window, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().mean()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single() {
        let mut smoother = Smoother::default();
        assert_eq!(smoother.mean(), 0.0);
        assert!((smoother.push(0.4) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut smoother = Smoother::new(30);
        let mut last = 0.0;
        for i in 1..=31 {
            last = smoother.push(i as f64 / 31.0);
        }

        let expected = (2..=31).map(|i| i as f64 / 31.0).sum::<f64>() / 30.0;
        assert_eq!(smoother.len(), 30);
        assert!((last - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_capacity_is_promoted() {
        let mut smoother = Smoother::new(0);
        assert_eq!(smoother.capacity(), 1);
        smoother.push(0.2);
        assert!((smoother.push(0.8) - 0.8).abs() < 1e-12);
    }
}
