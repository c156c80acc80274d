//! Output pattern rules: diagnostic matchers and counter extractors.
//!
//! Rules are declared as serializable [`RuleSpec`] values (configuration
//! boundary) and compiled into a [`RuleSet`] before any process launches.
//! A bad pattern fails compilation immediately; nothing is retried per line.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BuildyardError, Result};

/// Severity attached to a matched diagnostic line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// How a diagnostic pattern is applied to a line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Pattern may match anywhere in the line.
    Substring,

    /// Pattern must match at the start of the line.
    Anchored,
}

/// A declarative output-matching rule.
///
/// Counter rules are always anchored at line start; their first capture
/// group is parsed as an integer and overwrites the named counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    Counter { pattern: String, counter: String },
    Diagnostic {
        pattern: String,
        mode: MatchMode,
        severity: Severity,
    },
}

impl RuleSpec {
    /// Declare a counter extractor. Group 1 of `pattern` is the value.
    pub fn counter(pattern: &str, counter: &str) -> Self {
        RuleSpec::Counter {
            pattern: pattern.to_string(),
            counter: counter.to_string(),
        }
    }

    /// Declare a diagnostic matcher.
    pub fn diagnostic(pattern: &str, mode: MatchMode, severity: Severity) -> Self {
        RuleSpec::Diagnostic {
            pattern: pattern.to_string(),
            mode,
            severity,
        }
    }
}

/// A rule compiled against the `regex` engine.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    Counter { regex: Regex, counter: String },
    Diagnostic { regex: Regex, severity: Severity },
}

/// An ordered set of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile a list of rule specs, failing fast on the first bad pattern.
    pub fn compile(specs: &[RuleSpec]) -> Result<Self> {
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            rules.push(compile_rule(spec)?);
        }
        Ok(Self { rules })
    }

    /// An empty rule set (nothing matched, nothing counted).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Iterate the compiled rules in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }

    /// Names of all counters declared by this rule set.
    pub fn counter_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                CompiledRule::Counter { counter, .. } => Some(counter.clone()),
                CompiledRule::Diagnostic { .. } => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

fn compile_rule(spec: &RuleSpec) -> Result<CompiledRule> {
    match spec {
        RuleSpec::Counter { pattern, counter } => {
            // Counter matches are anchored at line start, not searched.
            let anchored = format!("^(?:{pattern})");
            let regex = Regex::new(&anchored).map_err(|source| {
                BuildyardError::PatternCompilation {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            Ok(CompiledRule::Counter {
                regex,
                counter: counter.clone(),
            })
        }
        RuleSpec::Diagnostic {
            pattern,
            mode,
            severity,
        } => {
            let effective = match mode {
                MatchMode::Substring => pattern.clone(),
                MatchMode::Anchored => format!("^(?:{pattern})"),
            };
            let regex =
                Regex::new(&effective).map_err(|source| BuildyardError::PatternCompilation {
                    pattern: pattern.clone(),
                    source,
                })?;
            Ok(CompiledRule::Diagnostic {
                regex,
                severity: *severity,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Builtin rule catalogs
// ---------------------------------------------------------------------------

/// Counter extractors for the test harness summary lines.
pub fn test_summary_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::counter(r"passed: (\d+)", "passed"),
        RuleSpec::counter(r"failed: (\d+)", "failed"),
        RuleSpec::counter(r"todo: (\d+)", "todo"),
    ]
}

/// Diagnostics emitted by the test harness itself.
pub fn harness_error_rules() -> Vec<RuleSpec> {
    vec![RuleSpec::diagnostic(
        r"FAILED \(errors=",
        MatchMode::Substring,
        Severity::Error,
    )]
}

/// Failures surfaced by `make` and the toolchain underneath it.
pub fn make_error_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::diagnostic(
            r"No rule to make target",
            MatchMode::Substring,
            Severity::Error,
        ),
        RuleSpec::diagnostic(r"make(\[\d+\])?: \*\*\*", MatchMode::Substring, Severity::Error),
        RuleSpec::diagnostic(
            r"recipe for target .* failed",
            MatchMode::Substring,
            Severity::Error,
        ),
        RuleSpec::diagnostic(r"missing separator", MatchMode::Substring, Severity::Error),
    ]
}

/// Interpreter-level failures the sandbox wrapper can emit on its own.
pub fn interpreter_error_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::diagnostic(
            r"Traceback \(most recent call last\)",
            MatchMode::Substring,
            Severity::Error,
        ),
        RuleSpec::diagnostic(r"SyntaxError: ", MatchMode::Substring, Severity::Error),
        RuleSpec::diagnostic(r"TypeError: ", MatchMode::Substring, Severity::Error),
        RuleSpec::diagnostic(r"NameError: ", MatchMode::Substring, Severity::Error),
        RuleSpec::diagnostic(r"ImportError: ", MatchMode::Substring, Severity::Error),
        RuleSpec::diagnostic(
            r"command not found",
            MatchMode::Substring,
            Severity::Error,
        ),
        RuleSpec::diagnostic(
            r"[Pp]ermission denied",
            MatchMode::Substring,
            Severity::Warning,
        ),
    ]
}

/// Extraction failures surfaced by packaging steps that shell out to tar.
pub fn archive_error_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::diagnostic(r"tar: Error", MatchMode::Substring, Severity::Error),
        RuleSpec::diagnostic(
            r"gzip: stdin: unexpected end of file",
            MatchMode::Substring,
            Severity::Error,
        ),
        RuleSpec::diagnostic(
            r"Unexpected EOF in archive",
            MatchMode::Substring,
            Severity::Error,
        ),
    ]
}
