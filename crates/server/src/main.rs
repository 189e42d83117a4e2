// crates/server/src/main.rs
//! Mediafetch server binary.
//!
//! Parses configuration, checks the downloader is callable, then serves the
//! API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mediafetch_core::{Downloader, YtDlp};
use mediafetch_server::{create_app, init_metrics, AppState, JobRegistry, ServerConfig};
use tracing_subscriber::EnvFilter;

/// Upper bound on how often finished jobs are swept.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop finished jobs older than `ttl`.
fn spawn_eviction(jobs: Arc<JobRegistry>, ttl: Duration) {
    let interval = ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let evicted = jobs.evict_finished(ttl);
            tracing::debug!(evicted, "swept finished downloads");
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,mediafetch_server=info,mediafetch_core=info".into()),
        )
        .init();

    let config = ServerConfig::parse();

    init_metrics();

    let downloader: Arc<dyn Downloader> = Arc::new(YtDlp::new(config.downloader.clone()));
    match downloader.health_check().await {
        Ok(version) => tracing::info!(downloader = downloader.name(), version = %version, "downloader available"),
        // Jobs will fail individually with a spawn error; keep serving.
        Err(e) => tracing::warn!(downloader = downloader.name(), error = %e, "downloader not available"),
    }

    let state = AppState::with_save_timeout(downloader, config.save_timeout());
    if let Some(ttl) = config.job_ttl() {
        tracing::info!(ttl_secs = ttl.as_secs(), "evicting finished downloads");
        spawn_eviction(Arc::clone(&state.jobs), ttl);
    }

    let app = create_app(state, config.static_dir.clone());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("mediafetch v{} listening on http://{addr}", env!("CARGO_PKG_VERSION"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
