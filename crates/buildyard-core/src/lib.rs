//! Buildyard Core Library
//!
//! Command adaptation, output classification, and verdict derivation for
//! the build farm. Re-exports the types the runner and CLI crates build on.

pub mod adapter;
pub mod classifier;
pub mod context;
pub mod error;
pub mod invocation;
pub mod matcher;
pub mod obs;
pub mod telemetry;
pub mod verdict;

pub use adapter::{build_invocation, ActionRequest};
pub use classifier::{MatchedLine, OutputClassifier, RunResult};
pub use context::{ExecutionContext, SandboxProfile};
pub use error::{BuildyardError, Result};
pub use invocation::{build_arg, merge_env, Invocation, OutputMode};
pub use matcher::{
    archive_error_rules, harness_error_rules, interpreter_error_rules, make_error_rules,
    test_summary_rules, CompiledRule, MatchMode, RuleSet, RuleSpec, Severity,
};
pub use obs::{emit_action_classified, emit_action_started, emit_status_reported, JobSpan};
pub use telemetry::init_tracing;
pub use verdict::{derive_verdict, tree_summary, Verdict, VerdictPolicy, VerdictStatus};

/// Buildyard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
