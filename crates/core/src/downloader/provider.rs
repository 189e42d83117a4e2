// crates/core/src/downloader/provider.rs
//! Downloader trait defining the interface to the external fetch process.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::error::DownloaderError;

/// An external command-line downloader.
///
/// Implementations only build commands; spawning and supervision belong to
/// the caller. The two command builders must never share a process: a
/// tracked run and a retrieval run are separate invocations.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Tracked run. Writes the media to stdout, which is discarded, and
    /// progress tokens interleaved with diagnostics to stderr, one per line.
    fn tracked(&self, url: &str) -> Command;

    /// Retrieval run. Writes the media bytes to stdout.
    fn retrieval(&self, url: &str) -> Command;

    /// Check the binary can be executed. Returns its version string.
    async fn health_check(&self) -> Result<String, DownloaderError>;

    /// Name for logging/display (e.g. "yt-dlp").
    fn name(&self) -> &str;
}

/// Spawn a downloader command with stdout and stderr piped.
///
/// Stdin is nulled so the child never waits for input, and the child is
/// killed if its handle is dropped.
pub fn spawn_piped(mut cmd: Command) -> Result<Child, DownloaderError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd.spawn().map_err(|e| {
        tracing::error!(program = %program, error = %e, "failed to spawn downloader");
        DownloaderError::spawn(program, e)
    })
}
