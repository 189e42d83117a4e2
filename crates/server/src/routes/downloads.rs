// crates/server/src/routes/downloads.rs
//! API routes for download jobs.
//!
//! - POST /download/start - Register a download and start it in the background
//! - GET|POST /download/pause?id= - Pause a running download
//! - GET|POST /download/resume?id= - Relaunch a paused download
//! - GET /download/status?id= - Current state of one download
//! - GET /downloads - Every known download, newest first
//! - GET /download/save?id= - Stream a completed download as a file

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use mediafetch_core::is_valid_job_id;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::jobs::JobSnapshot;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    /// Validate the `id` parameter before any registry lookup.
    fn require(self) -> ApiResult<String> {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ApiError::MissingJobId),
        };
        if !is_valid_job_id(&id) {
            return Err(ApiError::InvalidJobId(id));
        }
        Ok(id)
    }
}

/// POST /api/download/start - Create a job for `{url}`.
async fn start_download(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobSnapshot>)> {
    let Json(request) = payload?;
    let snapshot = state.jobs.create(request.url.trim())?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET|POST /api/download/pause - No-op unless downloading.
async fn pause_download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<JobSnapshot>> {
    let id = query.require()?;
    Ok(Json(state.jobs.pause(&id)?))
}

/// GET|POST /api/download/resume - No-op unless paused.
async fn resume_download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<JobSnapshot>> {
    let id = query.require()?;
    Ok(Json(state.jobs.resume(&id)?))
}

/// GET /api/download/status
async fn download_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<JobSnapshot>> {
    let id = query.require()?;
    state
        .jobs
        .snapshot(&id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(id))
}

/// GET /api/downloads
async fn list_downloads(State(state): State<Arc<AppState>>) -> Json<Vec<JobSnapshot>> {
    Json(state.jobs.list())
}

/// GET /api/download/save - Re-fetch a completed download and stream it.
///
/// Errors found before the downloader produces output become JSON errors.
/// Errors after that abort the response body.
async fn save_download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Response> {
    let id = query.require()?;
    let retrieval = state.gateway.open(&id)?;

    let disposition = format!("attachment; filename=\"{}\"", retrieval.filename);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(retrieval.stream))
        .map_err(|e| ApiError::Internal(format!("failed to build save response: {e}")))
}

/// Build the downloads router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/download/start", post(start_download))
        .route("/download/pause", get(pause_download).post(pause_download))
        .route("/download/resume", get(resume_download).post(resume_download))
        .route("/download/status", get(download_status))
        .route("/download/save", get(save_download))
        .route("/downloads", get(list_downloads))
}
