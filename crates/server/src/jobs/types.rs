// crates/server/src/jobs/types.rs
//! Types for the download job system.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use mediafetch_core::Platform;

/// Unique identifier for a download job.
pub type JobId = String;

/// Lifecycle state of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Paused,
    Completed,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        Self::Pending,
        Self::Downloading,
        Self::Paused,
        Self::Completed,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// `completed` and `error` are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a job, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub url: String,
    pub progress: f64,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
}

/// Authorisation for one supervisor run to mutate a job.
///
/// A ticket is only honoured while its generation is the job's current one.
/// Resume bumps the generation, which retires every older ticket.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub(crate) generation: u64,
    pub(crate) cancel: CancellationToken,
}

impl RunTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid URL: only {} are supported", supported_platforms())]
    UnsupportedUrl(String),

    #[error("download not found: {0}")]
    NotFound(JobId),
}

fn supported_platforms() -> String {
    let labels: Vec<_> = Platform::all().iter().map(|p| p.label()).collect();
    match labels.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, and {}", rest.join(", "), last),
        _ => labels.join(""),
    }
}
