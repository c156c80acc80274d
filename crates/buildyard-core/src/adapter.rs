//! The command adapter: logical action → concrete [`Invocation`].
//!
//! Pure transformation. The ambient environment never leaks in; callers
//! pass the base environment explicitly so the same request always yields
//! the same invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::context::ExecutionContext;
use crate::error::{BuildyardError, Result};
use crate::invocation::{merge_env, Invocation, OutputMode};
use crate::matcher::{interpreter_error_rules, RuleSet, RuleSpec};

/// A logical action plus everything needed to turn it into an invocation.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    /// Action label, used in error messages and reports.
    pub action: String,

    /// Command tokens; the first is the executable. Required.
    pub tokens: Vec<String>,

    /// Working directory. Required; the adapter never guesses one.
    pub cwd: Option<PathBuf>,

    /// Explicit snapshot of the environment the child starts from.
    pub env_base: BTreeMap<String, String>,

    /// Variables layered over `env_base`; overlay values win.
    pub env_overlay: BTreeMap<String, String>,

    /// Action-specific output rules.
    pub rules: Vec<RuleSpec>,

    /// Stream-and-monitor or capture semantics.
    pub mode: OutputMode,
}

impl ActionRequest {
    pub fn new(action: &str, tokens: Vec<String>, cwd: PathBuf) -> Self {
        Self {
            action: action.to_string(),
            tokens,
            cwd: Some(cwd),
            ..Self::default()
        }
    }
}

/// Translate an [`ActionRequest`] into an [`Invocation`] under a context.
///
/// Direct contexts pass tokens and working directory through verbatim.
/// Sandboxed contexts rewrite the working directory relative to the sandbox
/// home, strip the sandbox root from the command string, and wrap the
/// command in the wrapper executable. Capture-mode invocations omit the
/// wrapper's pass-through flag.
pub fn build_invocation(
    request: &ActionRequest,
    context: &ExecutionContext,
) -> Result<Invocation> {
    if request.tokens.is_empty() {
        return Err(missing(request, "command"));
    }
    let cwd = request
        .cwd
        .clone()
        .ok_or_else(|| missing(request, "working_dir"))?;

    let env = merge_env(&request.env_base, &request.env_overlay);

    match context {
        ExecutionContext::Direct => Ok(Invocation {
            tokens: request.tokens.clone(),
            cwd,
            env,
            rules: RuleSet::compile(&request.rules)?,
            mode: request.mode,
        }),
        ExecutionContext::Sandboxed(profile) => {
            // The wrapper receives the whole command as one argument, with
            // the sandbox root stripped: inside, the root is `/`.
            let inner = profile.strip_root(&request.tokens.join(" "));

            let mut tokens = vec![profile.wrapper.to_string_lossy().into_owned()];
            if request.mode == OutputMode::Stream {
                tokens.push(profile.passthrough_flag.clone());
            }
            tokens.push(profile.chdir_flag.clone());
            tokens.push(profile.rewrite_cwd(&cwd));
            tokens.push(inner);

            // The wrapper itself can fail at the interpreter level; those
            // signatures are matched ahead of the action's own rules.
            let mut specs = interpreter_error_rules();
            specs.extend(request.rules.iter().cloned());

            Ok(Invocation {
                tokens,
                cwd: profile.home.clone(),
                env,
                rules: RuleSet::compile(&specs)?,
                mode: request.mode,
            })
        }
    }
}

fn missing(request: &ActionRequest, key: &str) -> BuildyardError {
    BuildyardError::MissingParameter {
        action: request.action.clone(),
        key: key.to_string(),
    }
}
