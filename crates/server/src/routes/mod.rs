//! API route handlers for the mediafetch server.

pub mod downloads;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/metrics - Prometheus metrics
/// - POST /api/download/start - Start a download
/// - GET|POST /api/download/pause - Pause a download
/// - GET|POST /api/download/resume - Resume a paused download
/// - GET  /api/download/status - Status of one download
/// - GET  /api/downloads - List all downloads
/// - GET  /api/download/save - Stream a completed download
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", metrics::router())
        .nest("/api", downloads::router())
        .with_state(state)
}
