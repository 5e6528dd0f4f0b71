//! Fixed-capacity rolling windows (drop-oldest)

use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 100;

/// A bounded FIFO of samples. Pushing onto a full window evicts the oldest.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingWindow<T> {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);

        debug_assert!(
            self.samples.len() <= self.capacity,
            "rolling window exceeded capacity: {} > {}",
            self.samples.len(),
            self.capacity
        );
        // Unreachable unless push logic changes; release builds trim quietly.
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// Owned copy, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }
}

impl<T: Clone> Default for RollingWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_below_capacity_keeps_everything() {
        let mut w = RollingWindow::new(5);
        for i in 0..3 {
            w.push(i);
        }
        assert_eq!(w.len(), 3);
        assert!(!w.is_full());
        assert_eq!(w.to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_push_past_capacity_drops_oldest() {
        let mut w = RollingWindow::new(100);
        for i in 0..250u64 {
            w.push(i);
        }
        assert_eq!(w.len(), 100);
        assert_eq!(w.to_vec(), (150..250).collect::<Vec<_>>());
        assert_eq!(w.latest(), Some(&249));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut w = RollingWindow::new(0);
        w.push(1.0);
        w.push(2.0);
        assert_eq!(w.capacity(), 1);
        assert_eq!(w.to_vec(), vec![2.0]);
    }

    #[test]
    fn test_copy_is_detached() {
        let mut w = RollingWindow::new(3);
        w.push(1);
        let mut copy = w.to_vec();
        copy.push(99);
        w.push(2);
        assert_eq!(w.to_vec(), vec![1, 2]);
    }
}
