//! Status reporting boundary.
//!
//! The build-tracking system lives behind [`StatusReporter`]; the pipeline
//! only ever hands it finished verdicts. [`LogReporter`] is the production
//! default (the farm scrapes the log stream); [`MemoryReporter`] backs the
//! tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use buildyard_core::verdict::VerdictStatus;

/// One reported action outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    /// Job this report belongs to.
    pub job_id: String,

    /// Action label.
    pub action: String,

    /// Tri-state verdict.
    pub status: VerdictStatus,

    /// Status phrase ("success", "test failures", ...).
    pub phrase: String,

    /// Counter summary line, present when the action tracked tests.
    pub summary: Option<String>,

    /// Terminal exit code of the underlying process.
    pub exit_code: i32,

    /// When the report was produced.
    pub reported_at: DateTime<Utc>,
}

/// Sink for finished verdicts.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, report: StatusReport) -> anyhow::Result<()>;
}

/// Reporter that emits through the tracing stream.
///
/// The counter summary goes out on its own line in the fixed
/// `TreeStatusPrint:` format the dashboard scraper keys on.
pub struct LogReporter;

#[async_trait]
impl StatusReporter for LogReporter {
    async fn report(&self, report: StatusReport) -> anyhow::Result<()> {
        if let Some(summary) = &report.summary {
            info!("TreeStatusPrint: {}<br/>{}", report.action, summary);
        }
        match report.status {
            VerdictStatus::Success => {
                info!(
                    action = %report.action,
                    exit_code = report.exit_code,
                    "{} exited with return code {}: {}",
                    report.action, report.exit_code, report.phrase
                );
            }
            VerdictStatus::Warning => {
                warn!(
                    action = %report.action,
                    exit_code = report.exit_code,
                    "{} exited with return code {}: {}",
                    report.action, report.exit_code, report.phrase
                );
            }
            VerdictStatus::Failure => {
                error!(
                    action = %report.action,
                    exit_code = report.exit_code,
                    "{} exited with return code {}: {}",
                    report.action, report.exit_code, report.phrase
                );
            }
        }
        Ok(())
    }
}

/// In-memory reporter for tests.
#[derive(Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<StatusReport>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far, in order.
    pub async fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl StatusReporter for MemoryReporter {
    async fn report(&self, report: StatusReport) -> anyhow::Result<()> {
        self.reports.lock().await.push(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: VerdictStatus) -> StatusReport {
        StatusReport {
            job_id: "job-1".to_string(),
            action: "run_tests".to_string(),
            status,
            phrase: "success".to_string(),
            summary: Some("12/0/2".to_string()),
            exit_code: 0,
            reported_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.report(sample(VerdictStatus::Success)).await.unwrap();
        let mut second = sample(VerdictStatus::Failure);
        second.action = "build".to_string();
        reporter.report(second).await.unwrap();

        let reports = reporter.reports().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].action, "run_tests");
        assert_eq!(reports[1].action, "build");
        assert_eq!(reports[1].status, VerdictStatus::Failure);
    }

    #[tokio::test]
    async fn test_log_reporter_accepts_all_statuses() {
        let reporter = LogReporter;
        for status in [
            VerdictStatus::Success,
            VerdictStatus::Warning,
            VerdictStatus::Failure,
        ] {
            reporter.report(sample(status)).await.unwrap();
        }
    }

    #[test]
    fn test_status_report_serde_roundtrip() {
        let report = sample(VerdictStatus::Warning);
        let json = serde_json::to_string(&report).expect("serialize");
        let back: StatusReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(report, back);
    }
}
