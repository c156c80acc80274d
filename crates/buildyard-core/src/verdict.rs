//! Verdict derivation: exit code + counters → tri-state status.

use serde::{Deserialize, Serialize};

use crate::classifier::RunResult;
use crate::matcher::Severity;

/// Markup wrapped around an emphasized failure count in summaries.
const EMPHASIZE_FAIL_OPEN: &str = r#"<em class="testfail">"#;
const EMPHASIZE_FAIL_CLOSE: &str = "</em>";

/// Tri-state classification of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Success,
    Warning,
    Failure,
}

/// The final classification of one run: status, phrase, log severity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,

    /// Short human-readable status phrase ("success", "test failures", ...).
    pub phrase: String,

    /// Severity the verdict should be logged at.
    pub level: Severity,
}

/// Policy knobs for verdict derivation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerdictPolicy {
    /// Exit code meaning "tests failed but the harness itself ran".
    /// `None` treats every nonzero exit as a harness failure.
    pub tests_failed_code: Option<i32>,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            tests_failed_code: Some(10),
        }
    }
}

impl VerdictPolicy {
    /// Policy for steps with no designated tests-failed code: any nonzero
    /// exit is a harness failure.
    pub fn strict() -> Self {
        Self {
            tests_failed_code: None,
        }
    }
}

/// Derive a [`Verdict`] from one [`RunResult`].
///
/// Exit code first: 0 is success, the designated tests-failed code is a
/// warning, anything else is a harness failure at error level. A clean exit
/// with test counters tracked but both `passed` and `failed` still zero is
/// reclassified as a failure — a run that executed nothing must not show up
/// green.
pub fn derive_verdict(result: &RunResult, policy: &VerdictPolicy) -> Verdict {
    if result.exit_code == 0 {
        if result.tracks_tests()
            && result.counter("passed") == 0
            && result.counter("failed") == 0
        {
            return Verdict {
                status: VerdictStatus::Failure,
                phrase: "no tests were run".to_string(),
                level: Severity::Error,
            };
        }
        return Verdict {
            status: VerdictStatus::Success,
            phrase: "success".to_string(),
            level: Severity::Info,
        };
    }

    if policy.tests_failed_code == Some(result.exit_code) {
        return Verdict {
            status: VerdictStatus::Warning,
            phrase: "test failures".to_string(),
            level: Severity::Warning,
        };
    }

    Verdict {
        status: VerdictStatus::Failure,
        phrase: "harness failures".to_string(),
        level: Severity::Error,
    }
}

/// One-line, machine-parsable counter summary for the dashboard.
///
/// Format: `<passed>/<failed>/<todo>`, the failed count wrapped in
/// emphasis markup when nonzero. A run with zero passed and zero failed
/// renders the emphasized `T-FAIL` marker instead.
pub fn tree_summary(result: &RunResult) -> String {
    let passed = result.counter("passed");
    let failed = result.counter("failed");
    let todo = result.counter("todo");

    if passed == 0 && failed == 0 {
        return format!("{EMPHASIZE_FAIL_OPEN}T-FAIL{EMPHASIZE_FAIL_CLOSE}");
    }

    let failed_text = if failed > 0 {
        format!("{EMPHASIZE_FAIL_OPEN}{failed}{EMPHASIZE_FAIL_CLOSE}")
    } else {
        failed.to_string()
    };

    format!("{passed}/{failed_text}/{todo}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::OutputClassifier;
    use crate::matcher::{test_summary_rules, RuleSet};

    fn classify(lines: &[&str], exit_code: i32) -> RunResult {
        let rules = RuleSet::compile(&test_summary_rules()).expect("compile failed");
        let mut classifier = OutputClassifier::new(rules);
        for line in lines {
            classifier.feed_line(line);
        }
        classifier.finalize(exit_code)
    }

    #[test]
    fn test_scenario_clean_run_is_success() {
        let result = classify(&["passed: 12", "failed: 0", "todo: 2"], 0);
        let verdict = derive_verdict(&result, &VerdictPolicy::default());
        assert_eq!(verdict.status, VerdictStatus::Success);
        assert_eq!(verdict.level, Severity::Info);
        assert_eq!(tree_summary(&result), "12/0/2");
    }

    #[test]
    fn test_scenario_tests_failed_code_is_warning_with_emphasis() {
        let result = classify(&["passed: 8", "failed: 3", "todo: 1"], 10);
        let verdict = derive_verdict(&result, &VerdictPolicy::default());
        assert_eq!(verdict.status, VerdictStatus::Warning);
        assert_eq!(verdict.phrase, "test failures");
        assert_eq!(
            tree_summary(&result),
            r#"8/<em class="testfail">3</em>/1"#
        );
    }

    #[test]
    fn test_scenario_no_tests_ran_is_failure() {
        let result = classify(&[], 0);
        let verdict = derive_verdict(&result, &VerdictPolicy::default());
        assert_eq!(verdict.status, VerdictStatus::Failure);
        assert_eq!(verdict.phrase, "no tests were run");
        assert_eq!(
            tree_summary(&result),
            r#"<em class="testfail">T-FAIL</em>"#
        );
    }

    #[test]
    fn test_scenario_unrecognized_exit_is_failure_at_error_level() {
        let result = classify(&["passed: 4", "failed: 1"], 2);
        let verdict = derive_verdict(&result, &VerdictPolicy::default());
        assert_eq!(verdict.status, VerdictStatus::Failure);
        assert_eq!(verdict.phrase, "harness failures");
        assert_eq!(verdict.level, Severity::Error);
    }

    #[test]
    fn test_strict_policy_treats_designated_code_as_failure() {
        let result = classify(&["passed: 8", "failed: 3"], 10);
        let verdict = derive_verdict(&result, &VerdictPolicy::strict());
        assert_eq!(verdict.status, VerdictStatus::Failure);
    }

    #[test]
    fn test_clean_exit_without_test_counters_is_success() {
        // A build step tracks no counters; exit 0 must not trip the
        // no-tests anomaly.
        let rules = RuleSet::empty();
        let result = OutputClassifier::new(rules).finalize(0);
        let verdict = derive_verdict(&result, &VerdictPolicy::strict());
        assert_eq!(verdict.status, VerdictStatus::Success);
    }
}
