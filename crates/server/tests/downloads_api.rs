//! End-to-end tests for the download API, driving real `sh` processes
//! through the script downloader.
#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use mediafetch_core::ScriptDownloader;
use mediafetch_server::{create_app, AppState};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn app(downloader: ScriptDownloader) -> Router {
    create_app(AppState::new(Arc::new(downloader)), None)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn start(app: &Router, url: &str) -> (StatusCode, Value) {
    let request = Request::post("/api/download/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "url": url }).to_string()))
        .unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn wait_for_status(app: &Router, id: &str, wanted: &str) -> Value {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let (status, body) = get_json(app, &format!("/api/download/status?id={id}")).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == wanted || Instant::now() > deadline {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn start_returns_created_snapshot() {
    let app = app(ScriptDownloader::new("sleep 5", "true"));
    let (status, body) = start(&app, URL).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["url"], URL);
    assert_eq!(body["progress"], 0.0);
    assert!(body["status"] == "pending" || body["status"] == "downloading");
    assert!(body["createdAt"].as_str().unwrap().ends_with('Z'));
    assert!(body.get("error").is_none());

    let id = body["id"].as_str().unwrap();
    assert!(id.len() >= 8 && id.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn start_rejects_unsupported_url_without_registering() {
    let app = app(ScriptDownloader::new("exit 0", "true"));
    let (status, body) = start(&app, "https://vimeo.com/76979871").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("TikTok"));

    let (_, list) = get_json(&app, "/api/downloads").await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn start_rejects_malformed_json_and_wrong_content_type() {
    let app = app(ScriptDownloader::new("exit 0", "true"));

    let request = Request::post("/api/download/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"url\":"))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::post("/api/download/start")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(URL))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn id_parameter_is_validated_before_lookup() {
    let app = app(ScriptDownloader::new("exit 0", "true"));

    for route in ["status", "pause", "resume", "save"] {
        let (status, body) = get_json(&app, &format!("/api/download/{route}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{route}");
        assert_eq!(body["error"], "Download ID required");

        let (status, body) = get_json(&app, &format!("/api/download/{route}?id=bad-id!")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{route}");
        assert_eq!(body["error"], "Invalid download ID");

        let (status, _) = get_json(&app, &format!("/api/download/{route}?id=1234567890")).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{route}");
    }
}

#[tokio::test]
async fn completed_download_can_be_saved() {
    let app = app(ScriptDownloader::progress_then_exit(&[" 10.0%", " 99.0%"], 0));
    let (_, body) = start(&app, URL).await;
    let id = body["id"].as_str().unwrap().to_string();

    let snapshot = wait_for_status(&app, &id, "completed").await;
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["progress"], 100.0);

    let request = Request::get(format!("/api/download/save?id={id}"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"watch.mp4\""
    );
    assert_eq!(&body[..], b"media-bytes");

    // Saving is repeatable and leaves the job alone.
    let request = Request::get(format!("/api/download/save?id={id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"media-bytes");
    let (_, snapshot) = get_json(&app, &format!("/api/download/status?id={id}")).await;
    assert_eq!(snapshot["status"], "completed");
}

#[tokio::test]
async fn save_before_completion_is_rejected() {
    let app = app(ScriptDownloader::new("echo ' 5.0%' 1>&2; exec sleep 30", "printf 'x'"));
    let (_, body) = start(&app, URL).await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = get_json(&app, &format!("/api/download/save?id={id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Download not completed");
}

#[tokio::test]
async fn failed_download_reports_error() {
    let app = app(ScriptDownloader::new(
        "echo 'ERROR: [youtube] dQw4w9WgXcQ: Video unavailable' 1>&2; exit 1",
        "true",
    ));
    let (_, body) = start(&app, URL).await;
    let id = body["id"].as_str().unwrap().to_string();

    let snapshot = wait_for_status(&app, &id, "error").await;
    assert_eq!(snapshot["status"], "error");
    assert!(snapshot["error"]
        .as_str()
        .unwrap()
        .contains("Video unavailable"));
}

#[tokio::test]
async fn pause_and_resume_over_http() {
    let app = app(ScriptDownloader::new("echo ' 30.0%' 1>&2; exec sleep 30", "true"));
    let (_, body) = start(&app, URL).await;
    let id = body["id"].as_str().unwrap().to_string();
    wait_for_status(&app, &id, "downloading").await;

    let request = Request::post(format!("/api/download/pause?id={id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let paused: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(paused["status"], "paused");

    // Pausing again is a no-op, not an error.
    let (status, body) = get_json(&app, &format!("/api/download/pause?id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paused");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let (_, body) = get_json(&app, &format!("/api/download/status?id={id}")).await;
    assert_eq!(body["status"], "paused");
    assert!(body.get("error").is_none());

    let (status, body) = get_json(&app, &format!("/api/download/resume?id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "downloading");
    assert_eq!(body["progress"], 0.0);

    // Resume is a no-op once downloading.
    let (status, body) = get_json(&app, &format!("/api/download/resume?id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "downloading");
}

#[tokio::test]
async fn list_returns_newest_first() {
    let app = app(ScriptDownloader::new("sleep 5", "true"));
    let (_, first) = start(&app, URL).await;
    let (_, second) = start(&app, "https://www.tiktok.com/@user/video/123").await;

    let (status, list) = get_json(&app, "/api/downloads").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![second["id"].as_str().unwrap(), first["id"].as_str().unwrap()]
    );
}

#[tokio::test]
async fn health_counts_jobs() {
    let app = app(ScriptDownloader::new("sleep 5", "true"));
    start(&app, URL).await;

    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["downloader"], "script");
    assert_eq!(body["jobs"], 1);
}
