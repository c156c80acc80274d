//! buildyard - build farm pipeline driver
//!
//! ## Commands
//!
//! - `run`: execute a job config (actions + context) and report verdicts
//! - `classify`: re-classify a saved log file against the test rules

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use uuid::Uuid;

use buildyard_core::classifier::OutputClassifier;
use buildyard_core::context::ExecutionContext;
use buildyard_core::matcher::{harness_error_rules, test_summary_rules, RuleSet};
use buildyard_core::obs::JobSpan;
use buildyard_core::verdict::{
    derive_verdict, tree_summary, Verdict, VerdictPolicy, VerdictStatus,
};
use buildyard_runner::{ActionConfig, JobSpec, LogReporter, Pipeline, PipelineResult};

#[derive(Parser)]
#[command(name = "buildyard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build farm pipeline driver", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the actions in a job config file
    Run {
        /// Path to the job config (JSON)
        config: PathBuf,
    },

    /// Re-classify a saved log against the test-summary rules
    Classify {
        /// Path to the log file
        log: PathBuf,

        /// Exit code the original process terminated with
        #[arg(long, default_value_t = 0)]
        exit_code: i32,

        /// Exit code that designates "tests failed, harness healthy"
        #[arg(long, default_value_t = 10)]
        tests_failed_code: i32,
    },
}

/// On-disk job description.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobConfig {
    /// Platform label for reporting (e.g. "linux64").
    platform: String,

    /// Source revision under build/test.
    revision: String,

    /// Workspace root; the default working directory for every action.
    workspace: PathBuf,

    /// Execution context for every action in this job.
    #[serde(default = "default_context")]
    context: ExecutionContext,

    /// Ambient variables copied into the base environment by name.
    /// Everything else from the driver's environment is left implicit.
    #[serde(default)]
    env_passthrough: Vec<String>,

    /// Ordered actions to run.
    actions: Vec<ActionConfig>,
}

fn default_context() -> ExecutionContext {
    ExecutionContext::Direct
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    buildyard_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run { config } => {
            let result = cmd_run(&config).await?;
            std::process::exit(exit_code_for(&result));
        }
        Commands::Classify {
            log,
            exit_code,
            tests_failed_code,
        } => {
            let verdict = cmd_classify(&log, exit_code, tests_failed_code)?;
            std::process::exit(match verdict.status {
                VerdictStatus::Success => 0,
                VerdictStatus::Warning => 1,
                VerdictStatus::Failure => 2,
            });
        }
    }
}

async fn cmd_run(config_path: &PathBuf) -> Result<PipelineResult> {
    let raw = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading job config {}", config_path.display()))?;
    let config: JobConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing job config {}", config_path.display()))?;

    let action_names: Vec<String> = config
        .actions
        .iter()
        .filter(|a| a.enabled)
        .map(|a| a.name.clone())
        .collect();
    let spec = JobSpec::new(
        config.workspace.clone(),
        &action_names,
        config.revision.clone(),
        config.platform.clone(),
    );

    let mut env_base = BTreeMap::new();
    for name in &config.env_passthrough {
        if let Ok(value) = std::env::var(name) {
            env_base.insert(name.clone(), value);
        }
    }

    let result = Pipeline::run(
        Arc::new(LogReporter),
        &spec,
        &config.context,
        config.actions,
        env_base,
    )
    .await?;

    for outcome in &result.outcomes {
        match &outcome.summary {
            Some(summary) => {
                println!("{}: {} ({})", outcome.action, outcome.verdict.phrase, summary)
            }
            None => println!(
                "{}: {} (exit {})",
                outcome.action, outcome.verdict.phrase, outcome.result.exit_code
            ),
        }
    }
    Ok(result)
}

fn cmd_classify(log_path: &PathBuf, exit_code: i32, tests_failed_code: i32) -> Result<Verdict> {
    let job_id = Uuid::new_v4().to_string();
    let _span = JobSpan::enter(&job_id);

    let mut specs = test_summary_rules();
    specs.extend(harness_error_rules());
    let rules = RuleSet::compile(&specs)?;

    let raw = std::fs::read_to_string(log_path)
        .with_context(|| format!("reading log {}", log_path.display()))?;
    let mut classifier = OutputClassifier::new(rules);
    classifier.feed_text(&raw);
    let result = classifier.finalize(exit_code);

    let policy = VerdictPolicy {
        tests_failed_code: Some(tests_failed_code),
    };
    let verdict = derive_verdict(&result, &policy);

    info!(
        exit_code = exit_code,
        status = ?verdict.status,
        "classified {}", log_path.display()
    );
    println!("{}", tree_summary(&result));
    println!("verdict: {}", verdict.phrase);
    Ok(verdict)
}

/// Map a pipeline result to the driver's own exit code.
fn exit_code_for(result: &PipelineResult) -> i32 {
    if result.failed_count() > 0 {
        2
    } else if result.warning_count() > 0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_job_config_parses_with_defaults() {
        let json = r#"{
            "platform": "linux64",
            "revision": "4f6a2e9",
            "workspace": "/builds/work",
            "actions": [
                {"name": "build", "command": ["make", "-f", "client.mk", "build"]}
            ]
        }"#;
        let config: JobConfig = serde_json::from_str(json).expect("parse failed");
        assert_eq!(config.context, ExecutionContext::Direct);
        assert!(config.env_passthrough.is_empty());
        assert_eq!(config.actions.len(), 1);
        assert!(config.actions[0].enabled);
    }

    #[test]
    fn test_job_config_with_sandbox_context() {
        let json = r#"{
            "platform": "arm",
            "revision": "4f6a2e9",
            "workspace": "/sandbox/users/builder/home/builder/work",
            "context": {
                "mode": "sandboxed",
                "wrapper": "/sandbox/run",
                "root": "/sandbox/users/builder",
                "home": "/sandbox/users/builder/home/builder"
            },
            "actions": []
        }"#;
        let config: JobConfig = serde_json::from_str(json).expect("parse failed");
        assert!(config.context.is_sandboxed());
    }

    #[test]
    fn test_classify_warning_from_log_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "passed: 8").unwrap();
        writeln!(file, "failed: 3").unwrap();
        writeln!(file, "todo: 1").unwrap();

        let verdict =
            cmd_classify(&file.path().to_path_buf(), 10, 10).expect("classify failed");
        assert_eq!(verdict.status, VerdictStatus::Warning);
    }

    #[test]
    fn test_classify_empty_log_is_failure() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let verdict =
            cmd_classify(&file.path().to_path_buf(), 0, 10).expect("classify failed");
        assert_eq!(verdict.status, VerdictStatus::Failure);
    }

    #[test]
    fn test_exit_code_mapping() {
        let base = PipelineResult {
            job_id: "job-1".to_string(),
            success: true,
            outcomes: Vec::new(),
            duration_ms: 0,
            actions_digest: "abc".to_string(),
        };
        assert_eq!(exit_code_for(&base), 0);
    }
}
