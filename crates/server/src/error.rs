// crates/server/src/error.rs
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::gateway::RetrievalError;
use crate::jobs::JobError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    UnsupportedUrl(String),

    #[error("Download ID required")]
    MissingJobId,

    #[error("Invalid download ID: {0}")]
    InvalidJobId(String),

    #[error("Download not found: {0}")]
    JobNotFound(String),

    #[error("Download not completed: {0}")]
    JobNotCompleted(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::UnsupportedUrl(_) => ApiError::UnsupportedUrl(err.to_string()),
            JobError::NotFound(id) => ApiError::JobNotFound(id),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::NotFound(id) => ApiError::JobNotFound(id),
            RetrievalError::NotCompleted { .. } => ApiError::JobNotCompleted(err.to_string()),
            RetrievalError::Spawn(e) => ApiError::Retrieval(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(e) => ApiError::UnsupportedMediaType(e.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::UnsupportedUrl(msg) => {
                tracing::warn!(message = %msg, "Unsupported URL");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
            }
            ApiError::MissingJobId => {
                tracing::warn!("Download ID missing");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Download ID required"),
                )
            }
            ApiError::InvalidJobId(id) => {
                tracing::warn!(job_id = %id, "Invalid download ID");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Invalid download ID"),
                )
            }
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = %id, "Download not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Download not found", format!("Download ID: {}", id)),
                )
            }
            ApiError::JobNotCompleted(msg) => {
                tracing::warn!(message = %msg, "Download not completed");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Download not completed", msg.clone()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::UnsupportedMediaType(msg) => {
                tracing::warn!(message = %msg, "Unsupported media type");
                (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    ErrorResponse::with_details("Content-Type must be application/json", msg.clone()),
                )
            }
            ApiError::Retrieval(msg) => {
                tracing::error!(message = %msg, "Retrieval failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Failed to stream video"),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
