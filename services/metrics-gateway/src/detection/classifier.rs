use serde::{Deserialize, Serialize};
use crate::buffer::WindowedStatistics;
use crate::ingest::Sample;

/// |z| strictly above this marks a sample anomalous.
pub const ANOMALY_Z_THRESHOLD: f64 = 2.0;

/// Classification of one ingested sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub device_id: String,
    pub rolling_average: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
    pub timestamp: i64,
    pub value: f64,
}

/// Fixed z-score rule. Stateless: callers pass the statistics of the window that
/// already contains the sample being classified.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyClassifier;

impl AnomalyClassifier {
    pub fn classify(&self, sample: &Sample, stats: &WindowedStatistics) -> AnalyticsResult {
        let z_score = stats.z_score(sample.value);
        AnalyticsResult {
            device_id: sample.entity_id.clone(),
            rolling_average: stats.mean,
            z_score,
            is_anomaly: z_score.abs() > ANOMALY_Z_THRESHOLD,
            timestamp: sample.timestamp,
            value: sample.value,
        }
    }
}
