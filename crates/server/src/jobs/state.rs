// crates/server/src/jobs/state.rs
//! Mutable state for a single download job.
//!
//! Every field that changes after creation sits behind the job's own mutex.
//! The lock is only held for field reads/writes, never across `.await` or
//! process I/O, so status polls stay cheap while a download runs.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;

use super::types::{JobId, JobSnapshot, JobStatus, RunTicket};

struct JobInner {
    status: JobStatus,
    progress: f64,
    error: Option<String>,
    generation: u64,
    cancel: CancellationToken,
    finished_at: Option<Instant>,
}

impl JobInner {
    fn owns(&self, ticket: &RunTicket) -> bool {
        self.generation == ticket.generation
    }
}

/// One tracked download.
pub struct Job {
    id: JobId,
    url: String,
    created_at: DateTime<Utc>,
    inner: Mutex<JobInner>,
}

impl Job {
    /// Create a job in `pending` state with a fresh cancellation token.
    pub fn new(id: JobId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            created_at: Utc::now(),
            inner: Mutex::new(JobInner {
                status: JobStatus::Pending,
                progress: 0.0,
                error: None,
                generation: 0,
                cancel: CancellationToken::new(),
                finished_at: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn lock(&self) -> MutexGuard<'_, JobInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let inner = self.lock();
        JobSnapshot {
            id: self.id.clone(),
            url: self.url.clone(),
            progress: inner.progress,
            status: inner.status,
            error: inner.error.clone(),
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Ticket for the run that is currently allowed to drive this job.
    pub fn current_ticket(&self) -> RunTicket {
        let inner = self.lock();
        RunTicket {
            generation: inner.generation,
            cancel: inner.cancel.clone(),
        }
    }

    /// Enter `downloading` with progress reset to 0.
    ///
    /// Returns `false` (and changes nothing) if the ticket is stale or
    /// cancelled, or the job has already left `pending`/`downloading`. The
    /// caller must not spawn a process in that case.
    pub fn begin_run(&self, ticket: &RunTicket) -> bool {
        let mut inner = self.lock();
        if !inner.owns(ticket) || ticket.cancel.is_cancelled() {
            return false;
        }
        if !matches!(inner.status, JobStatus::Pending | JobStatus::Downloading) {
            return false;
        }
        inner.status = JobStatus::Downloading;
        inner.progress = 0.0;
        inner.error = None;
        true
    }

    /// Overwrite the progress value. Last write wins.
    pub fn set_progress(&self, ticket: &RunTicket, progress: f64) -> bool {
        let mut inner = self.lock();
        if !inner.owns(ticket) || inner.status != JobStatus::Downloading {
            return false;
        }
        inner.progress = progress;
        true
    }

    /// Process exited zero. Ignored while paused or for a stale run.
    pub fn complete(&self, ticket: &RunTicket) -> bool {
        let mut inner = self.lock();
        if !inner.owns(ticket) || inner.status != JobStatus::Downloading {
            return false;
        }
        inner.status = JobStatus::Completed;
        inner.progress = 100.0;
        inner.finished_at = Some(Instant::now());
        true
    }

    /// Process failed. Ignored while paused or for a stale run, so a kill
    /// issued by pause is never recorded as an error.
    pub fn fail(&self, ticket: &RunTicket, error: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if !inner.owns(ticket) || inner.status != JobStatus::Downloading {
            return false;
        }
        inner.status = JobStatus::Error;
        inner.error = Some(error.into());
        inner.finished_at = Some(Instant::now());
        true
    }

    /// `downloading` → `paused`. Fires the run's cancellation token and
    /// returns immediately; the supervisor kills the process on its own time.
    pub fn pause(&self) -> bool {
        let mut inner = self.lock();
        if inner.status != JobStatus::Downloading {
            return false;
        }
        inner.cancel.cancel();
        inner.status = JobStatus::Paused;
        true
    }

    /// `paused` → `downloading` under a new generation and a fresh token.
    ///
    /// Prior progress is discarded. Returns the ticket the relaunched
    /// supervisor must run with, or `None` if the job was not paused.
    pub fn resume(&self) -> Option<RunTicket> {
        let mut inner = self.lock();
        if inner.status != JobStatus::Paused {
            return None;
        }
        inner.generation += 1;
        inner.cancel = CancellationToken::new();
        inner.status = JobStatus::Downloading;
        inner.progress = 0.0;
        inner.error = None;
        Some(RunTicket {
            generation: inner.generation,
            cancel: inner.cancel.clone(),
        })
    }

    /// Time since the job reached a terminal state, if it has.
    pub fn finished_for(&self) -> Option<Duration> {
        let inner = self.lock();
        if !inner.status.is_terminal() {
            return None;
        }
        inner.finished_at.map(|t| t.elapsed())
    }

    #[cfg(test)]
    pub(crate) fn hold_lock_for(&self, duration: Duration) {
        let _guard = self.lock();
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new("1700000000000000000".to_string(), "https://youtu.be/abc")
    }

    #[test]
    fn test_job_lifecycle_to_completed() {
        let job = job();
        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Pending);
        assert_eq!(snap.progress, 0.0);
        assert!(snap.created_at.ends_with('Z'));

        let ticket = job.current_ticket();
        assert!(job.begin_run(&ticket));
        assert_eq!(job.status(), JobStatus::Downloading);

        assert!(job.set_progress(&ticket, 12.5));
        assert!(job.set_progress(&ticket, 60.0));
        assert_eq!(job.snapshot().progress, 60.0);

        assert!(job.complete(&ticket));
        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.progress, 100.0);
        assert!(job.finished_for().is_some());
    }

    #[test]
    fn test_failure_records_message() {
        let job = job();
        let ticket = job.current_ticket();
        job.begin_run(&ticket);
        assert!(job.fail(&ticket, "downloader exited with exit status: 1"));

        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(
            snap.error.as_deref(),
            Some("downloader exited with exit status: 1")
        );
    }

    #[test]
    fn test_pause_only_from_downloading() {
        let job = job();
        assert!(!job.pause(), "pending jobs cannot be paused");
        assert_eq!(job.status(), JobStatus::Pending);

        let ticket = job.current_ticket();
        job.begin_run(&ticket);
        assert!(job.pause());
        assert!(ticket.is_cancelled());
        assert_eq!(job.status(), JobStatus::Paused);

        assert!(!job.pause(), "second pause is a no-op");
    }

    #[test]
    fn test_exit_after_pause_is_not_an_error() {
        let job = job();
        let ticket = job.current_ticket();
        job.begin_run(&ticket);
        job.set_progress(&ticket, 40.0);
        job.pause();

        assert!(!job.fail(&ticket, "killed"));
        assert!(!job.complete(&ticket));
        assert!(!job.set_progress(&ticket, 90.0));

        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Paused);
        assert_eq!(snap.progress, 40.0);
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_resume_replaces_token_and_resets_progress() {
        let job = job();
        let first = job.current_ticket();
        job.begin_run(&first);
        job.set_progress(&first, 55.0);
        job.pause();

        let second = job.resume().expect("paused job resumes");
        assert_eq!(second.generation(), first.generation() + 1);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Downloading);
        assert_eq!(snap.progress, 0.0);
    }

    #[test]
    fn test_resume_only_from_paused() {
        let job = job();
        assert!(job.resume().is_none());

        let ticket = job.current_ticket();
        job.begin_run(&ticket);
        assert!(job.resume().is_none());

        job.complete(&ticket);
        assert!(job.resume().is_none());
        assert_eq!(job.status(), JobStatus::Completed);
    }

    #[test]
    fn test_stale_run_cannot_touch_resumed_job() {
        let job = job();
        let old = job.current_ticket();
        job.begin_run(&old);
        job.pause();
        let new = job.resume().unwrap();

        assert!(!job.begin_run(&old));
        assert!(!job.set_progress(&old, 99.0));
        assert!(!job.fail(&old, "killed by pause"));
        assert!(!job.complete(&old));
        assert_eq!(job.status(), JobStatus::Downloading);

        assert!(job.begin_run(&new));
        assert!(job.complete(&new));
        assert_eq!(job.status(), JobStatus::Completed);
    }

    #[test]
    fn test_begin_run_refuses_cancelled_ticket() {
        let job = job();
        let ticket = job.current_ticket();
        ticket.cancel.cancel();
        assert!(!job.begin_run(&ticket));
        assert_eq!(job.status(), JobStatus::Pending);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let job = job();
        let ticket = job.current_ticket();
        job.begin_run(&ticket);
        job.fail(&ticket, "boom");

        assert!(!job.begin_run(&ticket));
        assert!(!job.complete(&ticket));
        assert!(!job.pause());
        assert!(job.resume().is_none());
        assert_eq!(job.status(), JobStatus::Error);
    }

    #[test]
    fn test_finished_for_only_when_terminal() {
        let job = job();
        assert!(job.finished_for().is_none());
        let ticket = job.current_ticket();
        job.begin_run(&ticket);
        job.pause();
        assert!(job.finished_for().is_none());
    }
}
