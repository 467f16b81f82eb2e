//! Per-device bounded sample history and the rolling statistics computed over it.

pub mod stats;
pub mod device;
pub mod registry;

pub use stats::{window_stats, WindowedStatistics};
pub use device::DeviceBuffer;
pub use registry::BufferRegistry;

/// Hard per-device history capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;
/// Number of most recent samples the rolling statistics look at.
pub const DEFAULT_WINDOW_SIZE: usize = 50;
