//! Drives the axum router in-process.

use std::sync::Arc;
use std::time::Duration;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use metrics_gateway::telemetry::METRICS;
use metrics_gateway::{api, Gateway, GatewayConfig};
use serde_json::Value;
use tower::ServiceExt;

fn app() -> (Router, Arc<Gateway>) {
    let gw = Arc::new(Gateway::from_config(GatewayConfig::default()).unwrap());
    (api::router(Arc::clone(&gw)), gw)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn post_metric(body: &str) -> Request<Body> {
    Request::post("/api/metrics").header("content-type", "application/json").body(Body::from(body.to_owned())).unwrap()
}

fn get(uri: &str) -> Request<Body> { Request::get(uri).body(Body::empty()).unwrap() }

#[tokio::test]
async fn accepts_valid_report() {
    let (app, gw) = app();
    let (status, body) = send(&app, post_metric(r#"{"timestamp":1,"device_id":"dev-a","cpu":12.0,"rps":300.0,"memory":40.0}"#)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], "accepted");
    assert_eq!(v["message"], "Metric received and queued for processing");
    assert_eq!(gw.registry().get("dev-a").unwrap().len(), 1);
}

#[tokio::test]
async fn rejects_bad_reports() {
    let (app, _) = app();
    let (status, body) = send(&app, post_metric("{nope")).await;
    assert_eq!((status, body.as_slice()), (StatusCode::BAD_REQUEST, &b"Invalid JSON"[..]));

    let (status, body) = send(&app, post_metric(r#"{"timestamp":1,"cpu":12.0}"#)).await;
    assert_eq!((status, body.as_slice()), (StatusCode::BAD_REQUEST, &b"device_id is required"[..]));
}

#[tokio::test]
async fn analyze_requires_device_id() {
    let (app, _) = app();
    for uri in ["/api/analyze", "/api/analyze?device_id="] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"device_id parameter is required");
    }
}

#[tokio::test]
async fn analyze_reports_rolling_average() {
    let (app, gw) = app();
    for (ts, cpu) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
        let body = format!(r#"{{"timestamp":{ts},"device_id":"dev-b","cpu":{cpu}}}"#);
        assert_eq!(send(&app, post_metric(&body)).await.0, StatusCode::ACCEPTED);
    }
    let (status, body) = send(&app, get("/api/analyze?device_id=dev-b")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["device_id"], "dev-b");
    assert_eq!(v["rolling_average"], 20.0);
    assert_eq!(v["window_size"], 50);
    assert!(gw.tasks().wait_idle(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn anomalies_endpoint_drains_results() {
    let (app, gw) = app();
    send(&app, post_metric(r#"{"timestamp":1,"device_id":"dev-c","cpu":5.0}"#)).await;
    assert!(gw.tasks().wait_idle(Duration::from_secs(5)).await);

    let (status, body) = send(&app, get("/api/anomalies")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["count"], 1);
    assert_eq!(v["anomalies"][0]["device_id"], "dev-c");
    assert_eq!(v["anomalies"][0]["is_anomaly"], false);

    let (_, body) = send(&app, get("/api/anomalies")).await;
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["count"], 0);
}

#[tokio::test]
async fn health_and_metrics_are_exposed() {
    let (app, gw) = app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["cache"], "connected");
    assert!(v["time"].as_i64().unwrap() > 0);

    send(&app, post_metric(r#"{"timestamp":1,"device_id":"dev-d","cpu":1.0,"rps":42.0}"#)).await;
    assert!(gw.tasks().wait_idle(Duration::from_secs(5)).await);
    // a labelled counter is only exported once a child exists
    METRICS.events_dropped.with_label_values(&["queue_full"]);
    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    for name in [
        "pulse_metrics_processed_total",
        "pulse_requests_total",
        "pulse_request_duration_seconds",
        "pulse_current_rps",
        "pulse_anomalies_detected_total",
        "pulse_events_dropped_total{reason=\"queue_full\"}",
    ] {
        assert!(text.contains(name), "missing {name}");
    }
}

#[tokio::test]
async fn index_banner() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("Running"));
}
