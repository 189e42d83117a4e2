// crates/core/src/downloader/ytdlp.rs
//! yt-dlp downloader - builds `yt-dlp` invocations for tracked and retrieval runs.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::provider::Downloader;
use crate::error::DownloaderError;

/// Renders as e.g. ` 37.5%`, one per line with `--newline`.
const PROGRESS_TEMPLATE: &str = "%(progress._percent_str)s";

/// Downloader backed by the `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    version_timeout: Duration,
}

impl YtDlp {
    /// Use the given binary (a bare name is resolved through PATH).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            version_timeout: Duration::from_secs(5),
        }
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    fn tracked_args(url: &str) -> Vec<&str> {
        vec![
            "-o",
            "-",
            "--newline",
            "--progress",
            "--progress-template",
            PROGRESS_TEMPLATE,
            url,
        ]
    }

    fn retrieval_args(url: &str) -> Vec<&str> {
        vec!["-o", "-", url]
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Downloader for YtDlp {
    fn tracked(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::tracked_args(url));
        cmd
    }

    fn retrieval(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::retrieval_args(url));
        cmd
    }

    async fn health_check(&self) -> Result<String, DownloaderError> {
        let program = self.binary.display().to_string();
        let output = tokio::time::timeout(
            self.version_timeout,
            Command::new(&self.binary)
                .arg("--version")
                .stdin(std::process::Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            DownloaderError::Unavailable(format!(
                "{program} --version timed out after {}s",
                self.version_timeout.as_secs()
            ))
        })?
        .map_err(|e| DownloaderError::spawn(program.clone(), e))?;

        if !output.status.success() {
            return Err(DownloaderError::Unavailable(format!(
                "{program} --version exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn name(&self) -> &str {
        "yt-dlp"
    }
}
