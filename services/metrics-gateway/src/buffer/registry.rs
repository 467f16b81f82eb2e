use std::sync::Arc;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use tracing::debug;
use super::{DeviceBuffer, WindowedStatistics};

/// Device id to buffer map. Buffers are created on first write and never removed.
#[derive(Debug)]
pub struct BufferRegistry {
    buffers: RwLock<FxHashMap<String, Arc<DeviceBuffer>>>,
    capacity: usize,
}

impl BufferRegistry {
    /// `capacity` bounds every buffer the registry creates.
    pub fn new(capacity: usize) -> Self {
        Self { buffers: RwLock::new(FxHashMap::default()), capacity }
    }

    /// Returns the device's buffer, creating it exactly once under concurrent callers.
    pub fn get_or_create(&self, device_id: &str) -> Arc<DeviceBuffer> {
        if let Some(buf) = self.buffers.read().get(device_id) { return Arc::clone(buf); }
        let mut map = self.buffers.write();
        let buf = map.entry(device_id.to_owned()).or_insert_with(|| {
            debug!(device = %device_id, capacity = self.capacity, "creating device buffer");
            Arc::new(DeviceBuffer::new(self.capacity))
        });
        Arc::clone(buf)
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceBuffer>> {
        self.buffers.read().get(device_id).cloned()
    }

    /// Read-only: an unknown device yields zero statistics and no buffer is created.
    pub fn window_stats(&self, device_id: &str, window: usize) -> WindowedStatistics {
        self.get(device_id).map(|b| b.window_stats(window)).unwrap_or_default()
    }

    pub fn len(&self) -> usize { self.buffers.read().len() }
    pub fn is_empty(&self) -> bool { self.buffers.read().is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn concurrent_creation_yields_one_buffer() {
        let registry = Arc::new(BufferRegistry::new(16));
        let barrier = Arc::new(Barrier::new(16));
        let handles: Vec<_> = (0..16).map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || { barrier.wait(); registry.get_or_create("x") })
        }).collect();
        let buffers: Vec<Arc<DeviceBuffer>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(registry.len(), 1);
        assert!(buffers.iter().all(|b| Arc::ptr_eq(b, &buffers[0])));
    }

    #[test]
    fn buffers_are_isolated_per_device() {
        let registry = BufferRegistry::new(8);
        registry.get_or_create("a").append(1.0);
        registry.get_or_create("b").append(5.0);
        registry.get_or_create("a").append(3.0);
        assert_eq!(registry.window_stats("a", 50).mean, 2.0);
        assert_eq!(registry.window_stats("b", 50).mean, 5.0);
        assert_eq!(registry.get("a").unwrap().capacity(), 8);
    }

    #[test]
    fn reading_unknown_device_does_not_create_it() {
        let registry = BufferRegistry::new(8);
        assert_eq!(registry.window_stats("ghost", 50), WindowedStatistics::default());
        assert!(registry.get("ghost").is_none());
        assert!(registry.is_empty());
    }
}
