// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mediafetch_core::Downloader;

use crate::gateway::{RetrievalGateway, DEFAULT_SAVE_TIMEOUT};
use crate::jobs::JobRegistry;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Every download job created by this process.
    pub jobs: Arc<JobRegistry>,
    /// Re-fetches completed downloads for the save endpoint.
    pub gateway: RetrievalGateway,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(downloader: Arc<dyn Downloader>) -> Arc<Self> {
        Self::with_save_timeout(downloader, DEFAULT_SAVE_TIMEOUT)
    }

    pub fn with_save_timeout(downloader: Arc<dyn Downloader>, save_timeout: Duration) -> Arc<Self> {
        let jobs = Arc::new(JobRegistry::new(downloader));
        Arc::new(Self {
            start_time: Instant::now(),
            gateway: RetrievalGateway::new(Arc::clone(&jobs), save_timeout),
            jobs,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
