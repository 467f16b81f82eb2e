//! Prometheus collectors for the gateway, registered in the default registry and served
//! by `pulse_core::ops_routes` under `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, HistogramTimer, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

pub struct GatewayMetrics {
    pub requests_total: IntCounterVec,
    pub request_duration: HistogramVec,
    pub anomalies_detected: IntCounter,
    pub metrics_processed: IntCounter,
    pub current_rps: Gauge,
    pub events_dropped: IntCounterVec,
    pub background_tasks: IntGauge,
}

pub static METRICS: Lazy<GatewayMetrics> = Lazy::new(|| GatewayMetrics {
    requests_total: register_int_counter_vec!("pulse_requests_total", "Total number of requests", &["endpoint"])
        .expect("pulse_requests_total registration"),
    request_duration: register_histogram_vec!(
        "pulse_request_duration_seconds",
        "Request duration in seconds",
        &["endpoint"],
        prometheus::DEFAULT_BUCKETS.to_vec()
    )
    .expect("pulse_request_duration_seconds registration"),
    anomalies_detected: register_int_counter!("pulse_anomalies_detected_total", "Total number of anomalies detected")
        .expect("pulse_anomalies_detected_total registration"),
    metrics_processed: register_int_counter!("pulse_metrics_processed_total", "Total number of metrics processed")
        .expect("pulse_metrics_processed_total registration"),
    current_rps: register_gauge!("pulse_current_rps", "Last reported RPS value")
        .expect("pulse_current_rps registration"),
    events_dropped: register_int_counter_vec!("pulse_events_dropped_total", "Analytics results dropped before delivery", &["reason"])
        .expect("pulse_events_dropped_total registration"),
    background_tasks: register_int_gauge!("pulse_background_tasks", "Fire-and-forget tasks currently running")
        .expect("pulse_background_tasks registration"),
});

/// Counts a request against `endpoint` and returns a guard that records its latency on drop.
pub fn observe_request(endpoint: &str) -> HistogramTimer {
    METRICS.requests_total.with_label_values(&[endpoint]).inc();
    METRICS.request_duration.with_label_values(&[endpoint]).start_timer()
}
