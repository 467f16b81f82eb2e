use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;
use crate::gateway::{AnomalyListing, Gateway, HealthReport, RollingAverage};
use crate::ingest::{Accepted, MetricReport, ValidationError};
use crate::telemetry::observe_request;

pub type AppState = Arc<Gateway>;

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    MissingParam(&'static str),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self { ApiError::Validation(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let msg = match self {
            ApiError::Validation(ValidationError::Malformed(detail)) => {
                debug!(%detail, "rejecting malformed report");
                "Invalid JSON".to_string()
            }
            ApiError::Validation(e @ ValidationError::MissingDeviceId) => e.to_string(),
            ApiError::MissingParam(name) => format!("{name} parameter is required"),
        };
        (StatusCode::BAD_REQUEST, msg).into_response()
    }
}

/// Gateway API plus the shared `/live`, `/ready` and `/metrics` routes.
pub fn router(gateway: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/metrics", post(ingest_metric))
        .route("/api/analyze", get(analyze))
        .route("/api/anomalies", get(list_anomalies))
        .route("/health", get(health))
        .merge(pulse_core::ops_routes::<AppState>())
        .with_state(gateway)
}

async fn index() -> &'static str { "Pulse metrics gateway with streaming anomaly detection - Running" }

async fn ingest_metric(State(gw): State<AppState>, body: Bytes) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    let _timer = observe_request("/api/metrics");
    let report = MetricReport::from_json(&body)?;
    let ack = gw.ingest(report)?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub device_id: Option<String>,
}

async fn analyze(State(gw): State<AppState>, Query(q): Query<AnalyzeQuery>) -> Result<Json<RollingAverage>, ApiError> {
    let _timer = observe_request("/api/analyze");
    let device_id = q.device_id.unwrap_or_default();
    let avg = gw.query_rolling_average(&device_id).map_err(|_| ApiError::MissingParam("device_id"))?;
    Ok(Json(avg))
}

async fn list_anomalies(State(gw): State<AppState>) -> Json<AnomalyListing> {
    let _timer = observe_request("/api/anomalies");
    Json(gw.list_anomalies())
}

async fn health(State(gw): State<AppState>) -> Json<HealthReport> {
    Json(gw.health().await)
}
