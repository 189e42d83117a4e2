//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions for the download lifecycle
//! - Helper functions for recording metrics
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder.

use std::collections::HashMap;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::jobs::JobStatus;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    let mut installed = false;

    // Concurrent callers block here until the first one has stored the handle.
    PROMETHEUS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Failed to set global metrics recorder (already set)");
        } else {
            installed = true;
        }
        handle
    });

    if installed {
        describe_metrics();
        tracing::info!("Prometheus metrics initialized");
    }
    installed
}

fn describe_metrics() {
    describe_counter!(
        "downloads_started_total",
        "Number of download jobs accepted"
    );
    describe_counter!(
        "downloads_finished_total",
        "Number of download runs that reached a terminal state, by outcome"
    );
    describe_counter!("downloads_paused_total", "Number of downloads paused");
    describe_counter!("downloads_resumed_total", "Number of downloads resumed");
    describe_counter!(
        "retrievals_total",
        "Number of file retrievals, by outcome"
    );
    describe_counter!(
        "jobs_evicted_total",
        "Number of finished jobs removed from the registry"
    );
    describe_gauge!("downloads_current", "Jobs held by the registry, by status");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Registry-level lifecycle events.
#[derive(Debug, Clone, Copy)]
pub enum JobEvent {
    Started,
    Paused,
    Resumed,
    Evicted(u64),
}

pub fn record_job_event(event: JobEvent) {
    match event {
        JobEvent::Started => counter!("downloads_started_total").increment(1),
        JobEvent::Paused => counter!("downloads_paused_total").increment(1),
        JobEvent::Resumed => counter!("downloads_resumed_total").increment(1),
        JobEvent::Evicted(n) => counter!("jobs_evicted_total").increment(n),
    }
}

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
}

impl JobOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

pub fn record_job_finished(outcome: JobOutcome) {
    counter!("downloads_finished_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record one retrieval attempt.
///
/// # Arguments
/// * `outcome` - `"ok"`, `"rejected"`, `"spawn_failed"`, `"timed_out"` or `"failed"`
pub fn record_retrieval(outcome: &'static str) {
    counter!("retrievals_total", "outcome" => outcome).increment(1);
}

/// Publish how many jobs sit in each status. Statuses with no jobs read 0.
pub fn record_job_statuses(counts: &HashMap<JobStatus, usize>) {
    for status in JobStatus::ALL {
        let count = counts.get(&status).copied().unwrap_or(0);
        gauge!("downloads_current", "status" => status.as_str()).set(count as f64);
    }
}
