//! Core shared utilities for Pulse services.

use anyhow::Result;
use axum::{http::{header, StatusCode}, response::{IntoResponse, Response}, routing::get, Router};
use once_cell::sync::OnceCell;
use prometheus::{Encoder, TextEncoder};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static NODE_LIVENESS: AtomicBool = AtomicBool::new(true);
static NODE_READINESS: AtomicBool = AtomicBool::new(false);

/// Environment prefix for config overrides (`PULSE__PORT=9090`).
pub const ENV_PREFIX: &str = "PULSE";

pub fn mark_ready() { NODE_READINESS.store(true, Ordering::SeqCst); }
pub fn clear_ready() { NODE_READINESS.store(false, Ordering::SeqCst); }
/// Flips `/live` to false for the rest of the process, after an unrecoverable error.
pub fn mark_not_live() { NODE_LIVENESS.store(false, Ordering::SeqCst); }
pub fn is_ready() -> bool { NODE_READINESS.load(Ordering::SeqCst) }
pub fn is_live() -> bool { NODE_LIVENESS.load(Ordering::SeqCst) }

fn env_flag(name: &str) -> bool {
    std::env::var(name).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Installs the global subscriber once per process. Later calls are no-ops.
///
/// `RUST_LOG` drives filtering (default `info`), `PULSE_JSON_LOG=1` switches to
/// flattened JSON lines. With the `otlp` feature spans are also exported to
/// `OTEL_EXPORTER_OTLP_ENDPOINT`.
pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = env_flag("PULSE_JSON_LOG");
        let fmt_layer = if json {
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .boxed()
        };
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);
        #[cfg(feature = "otlp")]
        let registry = registry.with(tracing_opentelemetry::layer().with_tracer(otlp_tracer(service)?));
        registry.try_init()?;
        Ok(())
    })?;
    info!(%service, json = env_flag("PULSE_JSON_LOG"), "tracing initialized");
    Ok(())
}

#[cfg(feature = "otlp")]
fn otlp_tracer(service: &str) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry_otlp::WithExportConfig;
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| "http://localhost:4317".into());
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(opentelemetry_sdk::Resource::new(vec![
            opentelemetry::KeyValue::new("service.name", service.to_string()),
        ])))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;
    Ok(tracer)
}

/// Flushes pending spans. Without the `otlp` feature there is nothing to flush.
pub fn shutdown_tracer() {
    #[cfg(feature = "otlp")]
    opentelemetry::global::shutdown_tracer_provider();
}

/// Layered config: `defaults`, then the optional file named by `PULSE_CONFIG_FILE`,
/// then `PULSE__*` environment variables.
pub fn load_config<T>(service: &str, defaults: &T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut builder = config::Config::builder().add_source(config::Config::try_from(defaults)?);
    let file = std::env::var("PULSE_CONFIG_FILE").ok();
    if let Some(path) = &file {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );
    let cfg: T = builder.build()?.try_deserialize()?;
    info!(%service, file = ?file, "config loaded");
    Ok(cfg)
}

/// `/live`, `/ready` and the Prometheus `/metrics` exposition, mergeable into any router.
pub fn ops_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/live", get(|| async { axum::Json(serde_json::json!({"live": is_live()})) }))
        .route("/ready", get(|| async { axum::Json(serde_json::json!({"ready": is_ready()})) }))
        .route("/metrics", get(metrics_handler))
}

async fn metrics_handler() -> Response {
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buf) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response();
    }
    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], buf).into_response()
}
