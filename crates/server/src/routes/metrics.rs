//! Prometheus metrics endpoint.
//!
//! Exposes application metrics in Prometheus text format at `GET /api/metrics`.
//! Per-status job gauges are refreshed from the registry on every scrape.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::metrics::{record_job_statuses, render_metrics};
use crate::state::AppState;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /api/metrics - Prometheus metrics endpoint.
///
/// Returns 503 Service Unavailable if metrics are not initialized.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    record_job_statuses(&state.jobs.status_counts());
    match render_metrics() {
        Some(output) => (StatusCode::OK, [(header::CONTENT_TYPE, PROMETHEUS_TEXT)], output).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response(),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
