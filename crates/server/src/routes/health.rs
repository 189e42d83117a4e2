// crates/server/src/routes/health.rs
//! Health check endpoint for the API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::jobs::JobStatus;
use crate::state::AppState;

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub downloader: String,
    /// Number of jobs the registry currently holds.
    pub jobs: usize,
    pub jobs_by_status: HashMap<JobStatus, usize>,
}

/// GET /api/health - Health check endpoint.
///
/// Returns server status, version, uptime and job counts.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let jobs_by_status = state.jobs.status_counts();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        downloader: state.jobs.downloader().name().to_string(),
        jobs: jobs_by_status.values().sum(),
        jobs_by_status,
    })
}

/// Create the health routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
