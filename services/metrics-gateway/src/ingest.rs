use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("device_id is required")] MissingDeviceId,
    #[error("malformed payload: {0}")] Malformed(String),
}

/// Device report as posted by agents. `cpu` is the classified value, `rps` feeds the
/// last-seen rate gauge and `memory` only travels to the side cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub timestamp: i64,
    #[serde(default)]
    pub device_id: String,
    pub cpu: f64,
    #[serde(default)]
    pub rps: f64,
    #[serde(default)]
    pub memory: f64,
}

impl MetricReport {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(bytes).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    pub fn to_sample(&self) -> Result<Sample, ValidationError> {
        if self.device_id.is_empty() { return Err(ValidationError::MissingDeviceId); }
        Ok(Sample { timestamp: self.timestamp, entity_id: self.device_id.clone(), value: self.cpu })
    }
}

/// One numeric observation for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub entity_id: String,
    pub value: f64,
}

/// Acknowledgement returned once a report is buffered and its background work scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub status: &'static str,
    pub message: &'static str,
}

impl Default for Accepted {
    fn default() -> Self { Self { status: "accepted", message: "Metric received and queued for processing" } }
}
