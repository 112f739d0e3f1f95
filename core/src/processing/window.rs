use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent vehicle counts.
///
/// Pushing into a full window evicts the oldest count first; entries are never
/// reordered.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    counts: VecDeque<u64>,
    capacity: usize,
}

impl RollingWindow {
    /// `capacity` is clamped to at least one slot. Storage grows on demand
    /// up to `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends `count`, returning the evicted entry when the window was full.
    pub fn push(&mut self, count: u64) -> Option<u64> {
        let evicted = if self.counts.len() == self.capacity {
            self.counts.pop_front()
        } else {
            None
        };
        self.counts.push_back(count);
        evicted
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The newest `n` entries (or all of them), oldest first, as floats.
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let skip = self.counts.len().saturating_sub(n);
        self.counts.iter().skip(skip).map(|&c| c as f64).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.tail(self.counts.len())
    }
}
