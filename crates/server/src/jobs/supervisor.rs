// crates/server/src/jobs/supervisor.rs
//! Drives one external-process run for a job, from spawn to final status.
//!
//! Per run there are three tasks: the supervisor itself (waits for exit or
//! cancellation), a drain on stdout and a reader on stderr. A tracked run
//! writes the media to stdout and its progress tokens, interleaved with
//! diagnostics, to stderr. Stdout is discarded but must keep flowing or the
//! child blocks on a full pipe.

use std::sync::Arc;
use std::time::Duration;

use mediafetch_core::{extract_progress, spawn_piped, Downloader};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::state::Job;
use super::types::RunTicket;
use crate::metrics::{record_job_finished, JobOutcome};

/// How long readers get to drain after the process exits.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Longest stderr line kept while waiting for a line terminator.
const MAX_LINE: usize = 4 * 1024;

/// Longest stderr line kept for the error message.
const MAX_DIAGNOSTIC: usize = 500;

/// Run the downloader for `job` under `ticket` until it exits or is cancelled.
pub async fn supervise(job: Arc<Job>, downloader: Arc<dyn Downloader>, ticket: RunTicket) {
    if !job.begin_run(&ticket) {
        tracing::debug!(job_id = %job.id(), generation = ticket.generation(), "run superseded before start");
        return;
    }

    tracing::info!(
        job_id = %job.id(),
        url = %job.url(),
        downloader = downloader.name(),
        generation = ticket.generation(),
        "starting download"
    );

    let mut child = match spawn_piped(downloader.tracked(job.url())) {
        Ok(child) => child,
        Err(e) => {
            finish_failed(&job, &ticket, e.to_string());
            return;
        }
    };

    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => (stdout, stderr),
        (stdout, _) => {
            let stream = if stdout.is_none() { "stdout" } else { "stderr" };
            if let Err(e) = child.start_kill() {
                tracing::warn!(job_id = %job.id(), error = %e, "failed to kill downloader");
            }
            let _ = child.wait().await;
            finish_failed(
                &job,
                &ticket,
                mediafetch_core::DownloaderError::missing_pipe(downloader.name(), stream).to_string(),
            );
            return;
        }
    };

    let media_task = tokio::spawn(drain_media(job.id().to_string(), stdout));
    let stderr_task = tokio::spawn(read_stderr(
        job.id().to_string(),
        stderr,
        Some(ticket.cancel.clone()),
        {
            let job = Arc::clone(&job);
            let ticket = ticket.clone();
            move |progress| {
                job.set_progress(&ticket, progress);
            }
        },
    ));

    let exit = tokio::select! {
        status = child.wait() => status,
        _ = ticket.cancel.cancelled() => {
            tracing::info!(job_id = %job.id(), "pause requested, killing downloader");
            if let Err(e) = child.start_kill() {
                tracing::warn!(job_id = %job.id(), error = %e, "failed to kill downloader");
            }
            child.wait().await
        }
    };

    join_with_grace(media_task).await;
    let last_diagnostic = join_with_grace(stderr_task).await.flatten();

    match exit {
        Ok(status) if status.success() => {
            if job.complete(&ticket) {
                tracing::info!(job_id = %job.id(), "download completed");
                record_job_finished(JobOutcome::Completed);
            } else {
                tracing::debug!(job_id = %job.id(), "clean exit ignored, job paused or superseded");
            }
        }
        Ok(status) => {
            let message = match last_diagnostic {
                Some(line) => format!("downloader exited with {status}: {line}"),
                None => format!("downloader exited with {status}"),
            };
            finish_failed(&job, &ticket, message);
        }
        Err(e) => finish_failed(&job, &ticket, format!("failed to wait for downloader: {e}")),
    }
}

fn finish_failed(job: &Job, ticket: &RunTicket, message: String) {
    if job.fail(ticket, message.as_str()) {
        tracing::warn!(job_id = %job.id(), error = %message, "download failed");
        record_job_finished(JobOutcome::Failed);
    } else {
        tracing::debug!(job_id = %job.id(), error = %message, "exit ignored, job paused or superseded");
    }
}

async fn join_with_grace<T>(mut handle: JoinHandle<T>) -> Option<T> {
    match tokio::time::timeout(READER_GRACE, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "output reader task failed");
            None
        }
        Err(_) => {
            handle.abort();
            None
        }
    }
}

/// Discard the media a tracked run writes to stdout.
async fn drain_media<R>(job_id: String, mut stream: R)
where
    R: AsyncRead + Unpin,
{
    match tokio::io::copy(&mut stream, &mut tokio::io::sink()).await {
        Ok(bytes) => tracing::debug!(job_id = %job_id, bytes, "tracked run output discarded"),
        Err(e) => tracing::debug!(job_id = %job_id, error = %e, "media stream read failed"),
    }
}

/// Consume a downloader's stderr.
///
/// Lines end at `\n` or `\r`. Progress tokens go to `on_progress`; every
/// other line is logged. Returns the last non-empty line that was not a
/// progress token. With a `cancel` token, it is checked before each line and
/// once it fires the reader stops without reporting further progress.
pub(crate) async fn read_stderr<R, F>(
    job_id: String,
    mut stream: R,
    cancel: Option<CancellationToken>,
    mut on_progress: F,
) -> Option<String>
where
    R: AsyncRead + Unpin,
    F: FnMut(f64),
{
    let cancelled = || cancel.as_ref().is_some_and(CancellationToken::is_cancelled);
    let mut chunk = [0u8; 8 * 1024];
    let mut pending: Vec<u8> = Vec::new();
    let mut last = None;

    loop {
        let read = tokio::select! {
            biased;
            _ = async {
                match &cancel {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending().await,
                }
            } => return last,
            read = stream.read(&mut chunk) => read,
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "stderr read failed");
                break;
            }
        };

        pending.extend_from_slice(&chunk[..n]);
        while let Some(pos) = pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
            if cancelled() {
                return last;
            }
            let line: Vec<u8> = pending.drain(..=pos).collect();
            apply_line(&job_id, &line[..line.len() - 1], &mut on_progress, &mut last);
        }
        if pending.len() > MAX_LINE {
            pending.clear();
        }
    }

    if !pending.is_empty() && !cancelled() {
        apply_line(&job_id, &pending, &mut on_progress, &mut last);
    }
    last
}

fn apply_line<F>(job_id: &str, line: &[u8], on_progress: &mut F, last: &mut Option<String>)
where
    F: FnMut(f64),
{
    let line = String::from_utf8_lossy(line);
    if let Some(progress) = extract_progress(&line) {
        on_progress(progress);
        return;
    }
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if line.starts_with("ERROR") {
        tracing::warn!(job_id = %job_id, line = %line, "downloader stderr");
    } else {
        tracing::debug!(job_id = %job_id, line = %line, "downloader stderr");
    }
    *last = Some(line.chars().take(MAX_DIAGNOSTIC).collect());
}
