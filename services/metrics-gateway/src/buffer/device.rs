use std::collections::VecDeque;
use parking_lot::RwLock;
use super::stats::{window_stats, WindowedStatistics};

/// Preallocation cap so a large configured capacity does not reserve memory up front.
const MAX_PREALLOC: usize = 1024;

/// Arrival-ordered sample history for a single device, bounded by `capacity`.
///
/// Appends are serialized by the write lock; readers share the read lock and always
/// see whole appends.
#[derive(Debug)]
pub struct DeviceBuffer {
    values: RwLock<VecDeque<f64>>,
    capacity: usize,
}

impl DeviceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { values: RwLock::new(VecDeque::with_capacity(capacity.min(MAX_PREALLOC))), capacity }
    }

    /// Appends `value`, evicting the oldest samples beyond capacity. Returns the new length.
    pub fn append(&self, value: f64) -> usize {
        let mut guard = self.values.write();
        guard.push_back(value);
        while guard.len() > self.capacity { guard.pop_front(); }
        guard.len()
    }

    /// Copy of the last `window` samples, oldest first.
    pub fn snapshot_window(&self, window: usize) -> Vec<f64> {
        let guard = self.values.read();
        let start = guard.len().saturating_sub(window);
        guard.range(start..).copied().collect()
    }

    pub fn window_stats(&self, window: usize) -> WindowedStatistics {
        window_stats(&*self.values.read(), window)
    }

    pub fn len(&self) -> usize { self.values.read().len() }
    pub fn is_empty(&self) -> bool { self.values.read().is_empty() }
    pub fn capacity(&self) -> usize { self.capacity }
}
