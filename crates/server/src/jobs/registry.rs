// crates/server/src/jobs/registry.rs
//! Central registry of every download job created by this process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use mediafetch_core::{is_supported_url, Downloader, IdGenerator};

use super::state::Job;
use super::supervisor::supervise;
use super::types::{JobError, JobId, JobSnapshot, JobStatus, RunTicket};
use crate::metrics::{record_job_event, JobEvent};

/// Concurrent map of job id → job.
///
/// The map has its own reader/writer lock, separate from each job's lock:
/// a lookup clones the `Arc<Job>` and releases the map before touching the
/// job, so polls on different jobs never serialise on each other.
pub struct JobRegistry {
    ids: IdGenerator,
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
    downloader: Arc<dyn Downloader>,
}

impl JobRegistry {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            ids: IdGenerator::new(),
            jobs: RwLock::new(HashMap::new()),
            downloader,
        }
    }

    pub fn downloader(&self) -> &Arc<dyn Downloader> {
        &self.downloader
    }

    // Entries are only inserted or removed whole, so a panic while the lock
    // was held cannot leave the map half-updated.
    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<JobId, Arc<Job>>> {
        self.jobs.read().unwrap_or_else(|e| {
            tracing::warn!("jobs map lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Arc<Job>>> {
        self.jobs.write().unwrap_or_else(|e| {
            tracing::warn!("jobs map lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Validate `url`, register a `pending` job and launch its supervisor.
    ///
    /// Returns as soon as the job is registered; the download itself runs
    /// on a spawned task. Must be called from within a Tokio runtime.
    pub fn create(&self, url: &str) -> Result<JobSnapshot, JobError> {
        if !is_supported_url(url) {
            tracing::warn!(url = %url, "rejected unsupported URL");
            return Err(JobError::UnsupportedUrl(url.to_string()));
        }

        let job = Arc::new(Job::new(self.ids.next_id(), url));
        let ticket = job.current_ticket();
        let snapshot = job.snapshot();

        self.write_jobs().insert(job.id().to_string(), Arc::clone(&job));

        tracing::info!(job_id = %snapshot.id, url = %url, "download registered");
        record_job_event(JobEvent::Started);
        self.launch(job, ticket);

        Ok(snapshot)
    }

    fn launch(&self, job: Arc<Job>, ticket: RunTicket) {
        tokio::spawn(supervise(job, Arc::clone(&self.downloader), ticket));
    }

    /// Look up a job by id.
    pub fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.read_jobs().get(id).cloned()
    }

    /// Current status of a job.
    pub fn snapshot(&self, id: &str) -> Option<JobSnapshot> {
        self.get(id).map(|job| job.snapshot())
    }

    /// Snapshots of every known job, newest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let jobs: Vec<Arc<Job>> = self.read_jobs().values().cloned().collect();
        let mut snapshots: Vec<JobSnapshot> = jobs.iter().map(|job| job.snapshot()).collect();
        snapshots.sort_by(|a, b| newest_first(&a.id, &b.id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.read_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pause a downloading job. Any other state is left untouched.
    pub fn pause(&self, id: &str) -> Result<JobSnapshot, JobError> {
        let job = self.get(id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        if job.pause() {
            tracing::info!(job_id = %id, "download paused");
            record_job_event(JobEvent::Paused);
        } else {
            tracing::debug!(job_id = %id, status = %job.status(), "pause ignored");
        }
        Ok(job.snapshot())
    }

    /// Resume a paused job by relaunching the downloader from scratch.
    /// Any other state is left untouched.
    pub fn resume(&self, id: &str) -> Result<JobSnapshot, JobError> {
        let job = self.get(id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        match job.resume() {
            Some(ticket) => {
                tracing::info!(job_id = %id, generation = ticket.generation(), "download resumed");
                record_job_event(JobEvent::Resumed);
                let snapshot = job.snapshot();
                self.launch(job, ticket);
                Ok(snapshot)
            }
            None => {
                tracing::debug!(job_id = %id, status = %job.status(), "resume ignored");
                Ok(job.snapshot())
            }
        }
    }

    /// Drop `completed`/`error` jobs that finished more than `ttl` ago.
    /// Returns how many were removed.
    pub fn evict_finished(&self, ttl: Duration) -> usize {
        let mut jobs = self.write_jobs();
        let before = jobs.len();
        jobs.retain(|_, job| !job.finished_for().is_some_and(|age| age > ttl));
        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = jobs.len(), "evicted finished downloads");
            record_job_event(JobEvent::Evicted(evicted as u64));
        }
        evicted
    }

    /// Count jobs per status, for health reporting.
    pub fn status_counts(&self) -> HashMap<JobStatus, usize> {
        let mut counts = HashMap::new();
        for snapshot in self.list() {
            *counts.entry(snapshot.status).or_insert(0) += 1;
        }
        counts
    }
}

/// Ids are decimal timestamps, so longer means newer, then lexical.
fn newest_first(a: &str, b: &str) -> std::cmp::Ordering {
    b.len().cmp(&a.len()).then_with(|| b.cmp(a))
}
