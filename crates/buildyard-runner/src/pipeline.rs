//! Pipeline orchestration: ordered actions, verdicts, reporting.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use buildyard_core::adapter::{build_invocation, ActionRequest};
use buildyard_core::classifier::{MatchedLine, RunResult};
use buildyard_core::context::ExecutionContext;
use buildyard_core::matcher::Severity;
use buildyard_core::obs::{emit_action_classified, emit_action_started, emit_status_reported};
use buildyard_core::verdict::{derive_verdict, tree_summary, Verdict, VerdictStatus};
use chrono::Utc;

use crate::action::ActionConfig;
use crate::report::{StatusReport, StatusReporter};
use crate::runner::{ActionRunner, RunOutcome};
use crate::spec::JobSpec;

/// Outcome of one action inside a pipeline.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Action label.
    pub action: String,

    /// Classified run result.
    pub result: RunResult,

    /// Derived verdict.
    pub verdict: Verdict,

    /// Counter summary, present when the action tracked tests.
    pub summary: Option<String>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Result of a complete pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Job id assigned to this run.
    pub job_id: String,

    /// Whether no action ended in a Failure verdict.
    pub success: bool,

    /// Outcomes of the actions that ran, in order.
    pub outcomes: Vec<ActionOutcome>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the job's ordered action list.
    pub actions_digest: String,
}

impl PipelineResult {
    /// Number of actions with a Success verdict.
    pub fn passed_count(&self) -> usize {
        self.count(VerdictStatus::Success)
    }

    /// Number of actions with a Warning verdict.
    pub fn warning_count(&self) -> usize {
        self.count(VerdictStatus::Warning)
    }

    /// Number of actions with a Failure verdict.
    pub fn failed_count(&self) -> usize {
        self.count(VerdictStatus::Failure)
    }

    fn count(&self, status: VerdictStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.verdict.status == status)
            .count()
    }
}

/// Pipeline orchestrator.
pub struct Pipeline;

impl Pipeline {
    /// Execute the enabled actions in order under one execution context.
    ///
    /// Every action that launches gets a verdict, reported through the
    /// `reporter` as soon as it is derived. A spawn or timeout failure is
    /// folded into a Failure verdict rather than aborting the pipeline
    /// machinery; a Failure on a halting action stops the remaining
    /// actions. Setup errors (bad pattern, missing parameter) abort
    /// before anything launches.
    pub async fn run(
        reporter: Arc<dyn StatusReporter>,
        spec: &JobSpec,
        context: &ExecutionContext,
        actions: Vec<ActionConfig>,
        env_base: BTreeMap<String, String>,
    ) -> anyhow::Result<PipelineResult> {
        let start = Instant::now();
        let job_id = Uuid::new_v4().to_string();

        info!(
            job_id = %job_id,
            revision = %spec.revision,
            platform = %spec.platform,
            sandboxed = context.is_sandboxed(),
            "starting pipeline"
        );

        let mut outcomes = Vec::new();
        let mut success = true;

        for config in actions {
            if !config.enabled {
                info!(action = %config.name, "skipping disabled action");
                continue;
            }

            let request = ActionRequest {
                action: config.name.clone(),
                tokens: config.command.clone(),
                cwd: Some(
                    config
                        .working_dir
                        .clone()
                        .unwrap_or_else(|| spec.workspace_path.clone()),
                ),
                env_base: env_base.clone(),
                env_overlay: config.env.clone(),
                rules: config.rules.clone(),
                mode: config.mode,
            };
            let invocation = build_invocation(&request, context)?;

            emit_action_started(&job_id, &config.name, &invocation.command_line());
            let action_start = Instant::now();

            let outcome = match ActionRunner::execute(invocation, config.timeout_secs).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The process never produced an observable exit; fold
                    // the launcher error into a failure-shaped result so a
                    // verdict still reaches the reporter.
                    warn!(action = %config.name, error = %e, "action execution error");
                    RunOutcome {
                        result: RunResult {
                            exit_code: -1,
                            counters: BTreeMap::new(),
                            diagnostics: vec![MatchedLine {
                                severity: Severity::Error,
                                line: e.to_string(),
                            }],
                        },
                        captured: None,
                        duration_ms: action_start.elapsed().as_millis() as u64,
                    }
                }
            };

            let verdict = derive_verdict(&outcome.result, &config.policy);
            emit_action_classified(
                &job_id,
                &config.name,
                outcome.result.exit_code,
                &verdict,
                outcome.result.diagnostics.len(),
            );

            let summary = outcome
                .result
                .tracks_tests()
                .then(|| tree_summary(&outcome.result));

            reporter
                .report(StatusReport {
                    job_id: job_id.clone(),
                    action: config.name.clone(),
                    status: verdict.status,
                    phrase: verdict.phrase.clone(),
                    summary: summary.clone(),
                    exit_code: outcome.result.exit_code,
                    reported_at: Utc::now(),
                })
                .await?;
            emit_status_reported(&job_id, &config.name, &verdict);

            let halted = verdict.status == VerdictStatus::Failure && config.halt_on_failure;
            if verdict.status == VerdictStatus::Failure {
                success = false;
            }

            outcomes.push(ActionOutcome {
                action: config.name,
                result: outcome.result,
                verdict,
                summary,
                duration_ms: outcome.duration_ms,
            });

            if halted {
                warn!(job_id = %job_id, "halting pipeline after failed action");
                break;
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            job_id = %job_id,
            success = success,
            duration_ms = duration_ms,
            "pipeline finished"
        );

        Ok(PipelineResult {
            job_id,
            success,
            outcomes,
            duration_ms,
            actions_digest: spec.actions_digest.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildyard_core::matcher::Severity;

    fn outcome(action: &str, status: VerdictStatus) -> ActionOutcome {
        ActionOutcome {
            action: action.to_string(),
            result: RunResult {
                exit_code: 0,
                counters: BTreeMap::new(),
                diagnostics: Vec::new(),
            },
            verdict: Verdict {
                status,
                phrase: "test".to_string(),
                level: Severity::Info,
            },
            summary: None,
            duration_ms: 5,
        }
    }

    #[test]
    fn test_pipeline_result_counts() {
        let result = PipelineResult {
            job_id: "job-1".to_string(),
            success: false,
            outcomes: vec![
                outcome("build", VerdictStatus::Success),
                outcome("run_tests", VerdictStatus::Warning),
                outcome("package", VerdictStatus::Failure),
            ],
            duration_ms: 100,
            actions_digest: "abc".to_string(),
        };
        assert_eq!(result.passed_count(), 1);
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.failed_count(), 1);
    }
}
