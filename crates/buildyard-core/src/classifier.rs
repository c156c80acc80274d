//! Line-by-line output classification.
//!
//! An [`OutputClassifier`] is fed the child's combined output one line at a
//! time and accumulates counters and diagnostic lines. Finalization consumes
//! the classifier, so the type system enforces the two-state lifecycle:
//! lines can never be fed after the [`RunResult`] exists, and finalization
//! happens exactly once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::matcher::{CompiledRule, RuleSet, Severity};

/// A diagnostic line flagged by a rule, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchedLine {
    pub severity: Severity,
    pub line: String,
}

/// The raw outcome of one process execution.
///
/// Fully determined by the output stream and the exit code; immutable once
/// produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunResult {
    /// Terminal exit code of the child process.
    pub exit_code: i32,

    /// Accumulated counters. Every counter declared by the rule set is
    /// present, defaulting to zero.
    pub counters: BTreeMap<String, u64>,

    /// Diagnostic lines flagged during the run, in order.
    pub diagnostics: Vec<MatchedLine>,
}

impl RunResult {
    /// Value of a named counter; zero when the rule set never declared it.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Whether this rule set tracked test counters at all.
    pub fn tracks_tests(&self) -> bool {
        self.counters.contains_key("passed") || self.counters.contains_key("failed")
    }

    /// Highest severity among the flagged lines.
    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|m| m.severity).max()
    }
}

/// Streaming classifier for one invocation's output.
#[derive(Debug)]
pub struct OutputClassifier {
    rules: RuleSet,
    min_severity: Severity,
    counters: BTreeMap<String, u64>,
    diagnostics: Vec<MatchedLine>,
}

impl OutputClassifier {
    /// Create a classifier over a compiled rule set.
    ///
    /// All declared counters start at zero, so a run that never prints a
    /// summary still reports them.
    pub fn new(rules: RuleSet) -> Self {
        let counters = rules
            .counter_names()
            .into_iter()
            .map(|name| (name, 0))
            .collect();
        Self {
            rules,
            min_severity: Severity::Warning,
            counters,
            diagnostics: Vec::new(),
        }
    }

    /// Lower or raise the severity floor for diagnostic collection.
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Classify a single output line.
    ///
    /// Counter rules overwrite the named counter with the captured value
    /// (last value wins). A capture that fails to parse as an integer is
    /// skipped without aborting the run. Every diagnostic rule is tested,
    /// so one line can be flagged more than once.
    pub fn feed_line(&mut self, line: &str) {
        for rule in self.rules.iter() {
            match rule {
                CompiledRule::Counter { regex, counter } => {
                    if let Some(captures) = regex.captures(line) {
                        let Some(value) = captures.get(1) else {
                            continue;
                        };
                        match value.as_str().parse::<u64>() {
                            Ok(parsed) => {
                                self.counters.insert(counter.clone(), parsed);
                            }
                            Err(_) => {
                                debug!(counter = %counter, line = %line, "unparseable counter value, skipping");
                            }
                        }
                    }
                }
                CompiledRule::Diagnostic { regex, severity } => {
                    if *severity >= self.min_severity && regex.is_match(line) {
                        self.diagnostics.push(MatchedLine {
                            severity: *severity,
                            line: line.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Classify a captured blob line-by-line.
    pub fn feed_text(&mut self, text: &str) {
        for line in text.lines() {
            self.feed_line(line);
        }
    }

    /// Consume the classifier and produce the immutable [`RunResult`].
    pub fn finalize(self, exit_code: i32) -> RunResult {
        RunResult {
            exit_code,
            counters: self.counters,
            diagnostics: self.diagnostics,
        }
    }
}
