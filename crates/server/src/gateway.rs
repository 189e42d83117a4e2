// crates/server/src/gateway.rs
//! Retrieval of a finished download's bytes.
//!
//! The tracked run's output is never kept. Saving a completed job runs the
//! downloader a second time with its retrieval command and streams that
//! process's stdout straight to the caller. Nothing here touches job state.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use mediafetch_core::{derive_filename, spawn_piped, DownloaderError};
use thiserror::Error;
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

use crate::jobs::supervisor::read_stderr;
use crate::jobs::{JobId, JobRegistry, JobStatus};
use crate::metrics::record_retrieval;

/// Default bound on one whole retrieval, spawn to last byte.
pub const DEFAULT_SAVE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long to wait for stderr to drain after a failed exit.
const DIAGNOSTIC_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("download not found: {0}")]
    NotFound(JobId),

    #[error("download {id} is {status}, not completed")]
    NotCompleted { id: JobId, status: JobStatus },

    #[error(transparent)]
    Spawn(#[from] DownloaderError),
}

/// An open retrieval: the name to save under and the bytes to send.
pub struct Retrieval {
    pub filename: String,
    pub stream: BoxStream<'static, io::Result<Bytes>>,
}

impl std::fmt::Debug for Retrieval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrieval")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

pub struct RetrievalGateway {
    registry: Arc<JobRegistry>,
    timeout: Duration,
}

impl RetrievalGateway {
    pub fn new(registry: Arc<JobRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start re-fetching a completed job.
    ///
    /// Spawn failures are returned here, before any byte is produced. Once
    /// the stream is handed out, failures surface as stream errors. Dropping
    /// the stream kills the process.
    pub fn open(&self, id: &str) -> Result<Retrieval, RetrievalError> {
        let job = self
            .registry
            .get(id)
            .ok_or_else(|| RetrievalError::NotFound(id.to_string()))?;

        let status = job.status();
        if status != JobStatus::Completed {
            record_retrieval("rejected");
            return Err(RetrievalError::NotCompleted {
                id: id.to_string(),
                status,
            });
        }

        let downloader = self.registry.downloader();
        let mut child = spawn_piped(downloader.retrieval(job.url())).inspect_err(|e| {
            tracing::error!(job_id = %id, error = %e, "failed to start retrieval");
            record_retrieval("spawn_failed");
        })?;

        // A missing pipe drops `child` here, which kills it.
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloaderError::missing_pipe(downloader.name(), "stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloaderError::missing_pipe(downloader.name(), "stderr"))?;
        let diagnostics = tokio::spawn(read_stderr(id.to_string(), stderr, None, |_| {}));

        let filename = derive_filename(job.url());
        tracing::info!(job_id = %id, filename = %filename, "retrieval started");

        Ok(Retrieval {
            filename,
            stream: copy_output(id.to_string(), child, stdout, diagnostics, self.timeout).boxed(),
        })
    }
}

enum Step {
    Chunk(Option<io::Result<Bytes>>),
    TimedOut,
}

fn copy_output(
    job_id: String,
    mut child: Child,
    stdout: ChildStdout,
    diagnostics: JoinHandle<Option<String>>,
    timeout: Duration,
) -> impl futures_util::Stream<Item = io::Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut chunks = ReaderStream::new(stdout);
        let mut sent: u64 = 0;

        loop {
            let step = tokio::select! {
                _ = &mut deadline => Step::TimedOut,
                chunk = chunks.next() => Step::Chunk(chunk),
            };
            match step {
                Step::Chunk(Some(Ok(bytes))) => {
                    sent += bytes.len() as u64;
                    yield Ok(bytes);
                }
                Step::Chunk(Some(Err(e))) => {
                    tracing::warn!(job_id = %job_id, error = %e, bytes = sent, "retrieval read failed");
                    let _ = child.start_kill();
                    record_retrieval("failed");
                    yield Err(e);
                    return;
                }
                Step::Chunk(None) => break,
                Step::TimedOut => {
                    tracing::warn!(job_id = %job_id, bytes = sent, timeout_secs = timeout.as_secs(), "retrieval timed out");
                    let _ = child.start_kill();
                    diagnostics.abort();
                    record_retrieval("timed_out");
                    yield Err(timed_out(timeout));
                    return;
                }
            }
        }

        let exit = tokio::select! {
            _ = &mut deadline => None,
            status = child.wait() => Some(status),
        };
        match exit {
            Some(Ok(status)) if status.success() => {
                tracing::info!(job_id = %job_id, bytes = sent, "retrieval finished");
                record_retrieval("ok");
            }
            Some(Ok(status)) => {
                let detail = tokio::time::timeout(DIAGNOSTIC_GRACE, diagnostics)
                    .await
                    .ok()
                    .and_then(Result::ok)
                    .flatten();
                let message = match detail {
                    Some(line) => format!("downloader exited with {status}: {line}"),
                    None => format!("downloader exited with {status}"),
                };
                tracing::warn!(job_id = %job_id, bytes = sent, error = %message, "retrieval failed");
                record_retrieval("failed");
                yield Err(io::Error::other(message));
            }
            Some(Err(e)) => {
                tracing::warn!(job_id = %job_id, error = %e, "failed to wait for retrieval");
                record_retrieval("failed");
                yield Err(e);
            }
            None => {
                tracing::warn!(job_id = %job_id, bytes = sent, "retrieval timed out waiting for exit");
                let _ = child.start_kill();
                record_retrieval("timed_out");
                yield Err(timed_out(timeout));
            }
        }
    }
}

fn timed_out(timeout: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("retrieval exceeded {}s", timeout.as_secs()),
    )
}
