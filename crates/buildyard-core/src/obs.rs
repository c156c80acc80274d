//! Structured observability hooks for job lifecycle events.
//!
//! Emission helpers keep field names stable so downstream log scrapers can
//! key on `event=...` without caring about call sites. Everything goes out
//! at `info!` level through the subscriber configured by
//! [`crate::telemetry::init_tracing`].

use tracing::info;

use crate::verdict::Verdict;

/// RAII guard that scopes all tracing output to one job.
pub struct JobSpan {
    _span: tracing::span::EnteredSpan,
}

impl JobSpan {
    /// Create and enter a span tagged with the job id.
    pub fn enter(job_id: &str) -> Self {
        let span = tracing::info_span!("buildyard.job", job_id = %job_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: an action's process is about to launch.
pub fn emit_action_started(job_id: &str, action: &str, command: &str) {
    info!(event = "action.started", job_id = %job_id, action = %action, command = %command);
}

/// Emit event: an action's output was classified into a verdict.
pub fn emit_action_classified(
    job_id: &str,
    action: &str,
    exit_code: i32,
    verdict: &Verdict,
    diagnostics: usize,
) {
    info!(
        event = "action.classified",
        job_id = %job_id,
        action = %action,
        exit_code = exit_code,
        status = ?verdict.status,
        phrase = %verdict.phrase,
        diagnostics = diagnostics,
    );
}

/// Emit event: a verdict was handed to the status reporter.
pub fn emit_status_reported(job_id: &str, action: &str, verdict: &Verdict) {
    info!(event = "status.reported", job_id = %job_id, action = %action, status = ?verdict.status);
}
