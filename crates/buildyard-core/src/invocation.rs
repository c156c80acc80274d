//! Fully-specified, ready-to-execute command descriptions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::matcher::RuleSet;

/// How the launcher consumes the child's output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Stream lines into the classifier as they arrive.
    #[default]
    Stream,

    /// Collect output synchronously and hand back the blob.
    Capture,
}

/// A ready-to-execute command description.
///
/// Built fresh for each action by the [`crate::adapter`], consumed once by
/// the launcher, never reused.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Command tokens; the first is the executable.
    pub tokens: Vec<String>,

    /// Working directory for the child process.
    pub cwd: PathBuf,

    /// Environment variables set on top of the inherited environment.
    /// Deterministically ordered so two identical requests produce
    /// identical invocations.
    pub env: BTreeMap<String, String>,

    /// Compiled output rules for this invocation.
    pub rules: RuleSet,

    /// Stream-and-monitor or capture semantics.
    pub mode: OutputMode,
}

impl Invocation {
    /// The full command as a single display string.
    pub fn command_line(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Build a command-line argument pair, skipping empty values.
///
/// An option with no value contributes no tokens at all, so callers can
/// thread optional settings straight through without branching.
pub fn build_arg(option: &str, value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    vec![option.to_string(), value.to_string()]
}

/// Merge an overlay over a base environment; overlay values win.
pub fn merge_env(
    base: &BTreeMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_arg_with_value() {
        assert_eq!(
            build_arg("--address", "localhost:2828"),
            vec!["--address".to_string(), "localhost:2828".to_string()]
        );
    }

    #[test]
    fn test_build_arg_empty_value_emits_nothing() {
        assert!(build_arg("--address", "").is_empty());
    }

    #[test]
    fn test_merge_env_overlay_wins() {
        let mut base = BTreeMap::new();
        base.insert("PATH".to_string(), "/usr/bin".to_string());
        base.insert("LANG".to_string(), "C".to_string());

        let mut overlay = BTreeMap::new();
        overlay.insert("LANG".to_string(), "en_US.UTF-8".to_string());
        overlay.insert("JAVA_HOME".to_string(), "/opt/java".to_string());

        let merged = merge_env(&base, &overlay);
        assert_eq!(merged["PATH"], "/usr/bin");
        assert_eq!(merged["LANG"], "en_US.UTF-8");
        assert_eq!(merged["JAVA_HOME"], "/opt/java");
    }

    #[test]
    fn test_command_line_joins_tokens() {
        let invocation = Invocation {
            tokens: vec!["make".to_string(), "-f".to_string(), "client.mk".to_string()],
            cwd: PathBuf::from("."),
            env: BTreeMap::new(),
            rules: RuleSet::empty(),
            mode: OutputMode::Stream,
        };
        assert_eq!(invocation.command_line(), "make -f client.mk");
    }

    #[test]
    fn test_output_mode_default_is_stream() {
        assert_eq!(OutputMode::default(), OutputMode::Stream);
    }
}
