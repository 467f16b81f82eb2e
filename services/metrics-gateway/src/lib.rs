//! Pulse metrics gateway: per-device rolling statistics and z-score anomaly
//! classification over a stream of telemetry reports.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tracing::{info, warn};

pub mod api;
pub mod buffer;
pub mod cache;
pub mod config;
pub mod detection;
pub mod gateway;
pub mod ingest;
pub mod tasks;
pub mod telemetry;

pub use buffer::{window_stats, BufferRegistry, DeviceBuffer, WindowedStatistics};
pub use cache::{CacheError, DisabledCache, MemoryCache, SampleCache};
pub use config::GatewayConfig;
pub use detection::{AnalyticsResult, AnomalyClassifier, AnomalyEventQueue};
pub use gateway::{AnomalyListing, Gateway, HealthReport, RollingAverage};
pub use ingest::{Accepted, MetricReport, Sample, ValidationError};
pub use tasks::TaskSpawner;

pub const SERVICE: &str = "metrics-gateway";

/// Loads config, serves the HTTP API until ctrl-c, then lets in-flight background
/// tasks finish (bounded).
pub async fn run() -> Result<()> {
    pulse_core::init_tracing(SERVICE)?;
    let cfg = GatewayConfig::load(SERVICE)?;
    info!(?cfg, "config loaded");

    let gateway = Arc::new(Gateway::from_config(cfg)?);
    match gateway.cache().ping().await {
        Ok(()) => info!(target: "metrics-gateway", "Sample cache connected"),
        Err(e) => warn!(target: "metrics-gateway", error = %e, "Sample cache unavailable - running degraded mode"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], gateway.config().port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            pulse_core::mark_not_live();
            return Err(anyhow::Error::new(e).context(format!("binding {addr}")));
        }
    };
    pulse_core::mark_ready();
    info!(target: "metrics-gateway", %addr, "Starting metrics-gateway service");
    info!(target: "metrics-gateway", "Endpoints: /api/metrics (POST), /api/analyze (GET), /api/anomalies (GET), /health (GET), /metrics (Prometheus)");

    let served = axum::serve(listener, api::router(Arc::clone(&gateway)))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = served {
        pulse_core::mark_not_live();
        pulse_core::clear_ready();
        return Err(e.into());
    }

    pulse_core::clear_ready();
    if !gateway.tasks().wait_idle(Duration::from_secs(2)).await {
        warn!(in_flight = gateway.tasks().in_flight(), "background tasks still running at shutdown");
    }
    pulse_core::shutdown_tracer();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await { warn!(error = ?e, "ctrl-c handler failed"); }
    info!("shutdown_signal_received");
}
