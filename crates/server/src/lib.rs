// crates/server/src/lib.rs
//! Mediafetch server library.
//!
//! This crate provides the Axum-based HTTP server that runs media downloads
//! as background jobs. Jobs are driven by an external downloader process and
//! can be polled, paused, resumed and finally saved as a file.

pub mod config;
pub mod error;
pub mod gateway;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::*;
pub use gateway::{Retrieval, RetrievalError, RetrievalGateway};
pub use jobs::{JobRegistry, JobSnapshot, JobStatus};
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under `/api`
/// - Static files from `static_dir` for every other path, if given
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes(state));
    if let Some(dir) = static_dir {
        tracing::info!(static_dir = %dir.display(), "serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use mediafetch_core::YtDlp;
    use tower::ServiceExt;

    fn app() -> Router {
        create_app(AppState::new(Arc::new(YtDlp::default())), None)
    }

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get(app(), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
        assert!(body.contains("\"version\""));
        assert!(body.contains("\"uptimeSecs\""));
        assert!(body.contains("\"jobs\":0"));
    }

    #[tokio::test]
    async fn test_downloads_empty() {
        let (status, body) = get(app(), "/api/downloads").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_not_found_route() {
        let (status, _) = get(app(), "/api/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let dir = std::env::temp_dir().join(format!("mediafetch-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<h1>mediafetch</h1>").unwrap();

        let app = create_app(AppState::new(Arc::new(YtDlp::default())), Some(dir.clone()));
        let (status, body) = get(app.clone(), "/index.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>mediafetch</h1>");

        let (status, _) = get(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
