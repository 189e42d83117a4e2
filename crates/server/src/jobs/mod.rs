// crates/server/src/jobs/mod.rs
//! Download job system.
//!
//! Provides:
//! - `JobRegistry` - concurrent map of every job, creates/pauses/resumes
//! - `Job` - per-job state behind its own lock
//! - `supervise` - drives one external-process run for a job
//! - `JobSnapshot` - serialisable point-in-time view

pub mod registry;
pub mod state;
pub mod supervisor;
pub mod types;

pub use registry::JobRegistry;
pub use state::Job;
pub use types::{JobError, JobId, JobSnapshot, JobStatus, RunTicket};
