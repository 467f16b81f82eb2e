pub mod classifier;
pub mod queue;

pub use classifier::{AnalyticsResult, AnomalyClassifier, ANOMALY_Z_THRESHOLD};
pub use queue::{AnomalyEventQueue, DEFAULT_QUEUE_CAPACITY};
