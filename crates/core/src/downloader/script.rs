// crates/core/src/downloader/script.rs
//! Shell-script downloader for tests.
//!
//! Each run executes `sh -c <script> sh <url>`, so scripts can refer to the
//! URL as `$1`. Only available with the `test-util` feature.

use async_trait::async_trait;
use tokio::process::Command;

use super::provider::Downloader;
use crate::error::DownloaderError;

#[derive(Debug, Clone)]
pub struct ScriptDownloader {
    tracked: String,
    retrieval: String,
}

impl ScriptDownloader {
    pub fn new(tracked: impl Into<String>, retrieval: impl Into<String>) -> Self {
        Self {
            tracked: tracked.into(),
            retrieval: retrieval.into(),
        }
    }

    /// Tracked run writes some media to stdout and the given progress tokens
    /// to stderr, then exits with `code`.
    pub fn progress_then_exit(tokens: &[&str], code: i32) -> Self {
        let mut script = String::from("printf 'media-bytes'; ");
        for token in tokens {
            script.push_str(&format!("echo '{token}' 1>&2; "));
        }
        script.push_str(&format!("exit {code}"));
        Self::new(script, "printf 'media-bytes'")
    }

    fn command(script: &str, url: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script, "sh", url]);
        cmd
    }
}

#[async_trait]
impl Downloader for ScriptDownloader {
    fn tracked(&self, url: &str) -> Command {
        Self::command(&self.tracked, url)
    }

    fn retrieval(&self, url: &str) -> Command {
        Self::command(&self.retrieval, url)
    }

    async fn health_check(&self) -> Result<String, DownloaderError> {
        Ok("script".to_string())
    }

    fn name(&self) -> &str {
        "script"
    }
}
