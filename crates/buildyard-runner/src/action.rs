//! Action definitions and configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use buildyard_core::invocation::{build_arg, OutputMode};
use buildyard_core::matcher::{
    archive_error_rules, harness_error_rules, make_error_rules, test_summary_rules, RuleSpec,
};
use buildyard_core::verdict::VerdictPolicy;

/// Builtin build-farm actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinAction {
    /// make -f client.mk build
    Build,

    /// make package
    Package,

    /// make package-tests
    PackageTests,

    /// runtests (see [`ActionConfig::run_tests`] for the argument form)
    RunTests,
}

impl BuiltinAction {
    /// Get the action name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinAction::Build => "build",
            BuiltinAction::Package => "package",
            BuiltinAction::PackageTests => "package_tests",
            BuiltinAction::RunTests => "run_tests",
        }
    }

    /// Get the action's command tokens.
    pub fn command(&self) -> Vec<String> {
        match self {
            BuiltinAction::Build => {
                vec![
                    "make".to_string(),
                    "-f".to_string(),
                    "client.mk".to_string(),
                    "build".to_string(),
                ]
            }
            BuiltinAction::Package => vec!["make".to_string(), "package".to_string()],
            BuiltinAction::PackageTests => {
                vec!["make".to_string(), "package-tests".to_string()]
            }
            BuiltinAction::RunTests => vec!["runtests".to_string()],
        }
    }

    /// Output rules this action watches its stream with.
    pub fn rules(&self) -> Vec<RuleSpec> {
        match self {
            BuiltinAction::Build => make_error_rules(),
            BuiltinAction::Package | BuiltinAction::PackageTests => {
                let mut rules = make_error_rules();
                rules.extend(archive_error_rules());
                rules
            }
            BuiltinAction::RunTests => {
                let mut rules = test_summary_rules();
                rules.extend(harness_error_rules());
                rules
            }
        }
    }

    /// Verdict policy: only the test runner has a designated
    /// tests-failed exit code; everything else is all-or-nothing.
    pub fn policy(&self) -> VerdictPolicy {
        match self {
            BuiltinAction::RunTests => VerdictPolicy::default(),
            _ => VerdictPolicy::strict(),
        }
    }

    /// Whether a failed run of this action stops the pipeline.
    pub fn halts_on_failure(&self) -> bool {
        !matches!(self, BuiltinAction::RunTests)
    }
}

/// Configuration for one pipeline action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionConfig {
    /// Human-readable action name.
    pub name: String,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,

    /// Working directory; falls back to the job workspace when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Environment variables layered over the job's base environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Output rules applied to this action's stream.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    /// Verdict policy for this action.
    #[serde(default = "VerdictPolicy::strict")]
    pub policy: VerdictPolicy,

    /// Timeout in seconds (0 = no timeout).
    #[serde(default)]
    pub timeout_secs: u64,

    /// Whether this action is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether a Failure verdict stops the rest of the pipeline.
    #[serde(default = "default_true")]
    pub halt_on_failure: bool,

    /// Stream-and-monitor or capture semantics.
    #[serde(default)]
    pub mode: OutputMode,
}

fn default_true() -> bool {
    true
}

impl ActionConfig {
    /// Create an action configuration from a builtin action.
    pub fn from_builtin(action: BuiltinAction, timeout_secs: u64) -> Self {
        Self {
            name: action.name().to_string(),
            command: action.command(),
            working_dir: None,
            env: BTreeMap::new(),
            rules: action.rules(),
            policy: action.policy(),
            timeout_secs,
            enabled: true,
            halt_on_failure: action.halts_on_failure(),
            mode: OutputMode::Stream,
        }
    }

    /// Create a custom action configuration.
    pub fn custom(name: String, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            working_dir: None,
            env: BTreeMap::new(),
            rules: Vec::new(),
            policy: VerdictPolicy::strict(),
            timeout_secs,
            enabled: true,
            halt_on_failure: true,
            mode: OutputMode::Stream,
        }
    }

    /// Per-locale chrome build: `make chrome-<locale> L10NBASEDIR=<dir>`,
    /// plus `LOCALE_MERGEDIR` when merged locales are in play.
    pub fn add_locale(
        locale: &str,
        l10n_base: &Path,
        merge_dir: Option<&Path>,
        timeout_secs: u64,
    ) -> Self {
        let mut command = vec![
            "make".to_string(),
            format!("chrome-{locale}"),
            format!("L10NBASEDIR={}", l10n_base.display()),
        ];
        if let Some(merge_dir) = merge_dir {
            command.push(format!("LOCALE_MERGEDIR={}", merge_dir.display()));
        }
        let mut config = Self::custom(format!("add_locale_{locale}"), command, timeout_secs);
        config.rules = make_error_rules();
        config
    }

    /// Multi-locale packaging: `make package AB_CD=multi` with the full
    /// locale list exported for the packager.
    pub fn package_multi(locales: &[String], timeout_secs: u64) -> Self {
        let mut config = Self::from_builtin(BuiltinAction::Package, timeout_secs);
        config.name = "package_multi".to_string();
        config.command.push("AB_CD=multi".to_string());
        let list = std::iter::once("en-US")
            .chain(locales.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        config.env.insert("CHROME_MULTILOCALE".to_string(), list);
        config
    }

    /// The test-runner action with its argument set built through the
    /// empty-safe helper: unset values contribute no tokens.
    pub fn run_tests(
        binary: &Path,
        address: &str,
        test_type: &str,
        manifest: &Path,
        timeout_secs: u64,
    ) -> Self {
        let mut command = BuiltinAction::RunTests.command();
        command.extend(build_arg("--binary", &binary.display().to_string()));
        command.extend(build_arg("--address", address));
        command.extend(build_arg("--type", test_type));
        command.push(manifest.display().to_string());

        let mut config = Self::custom(BuiltinAction::RunTests.name().to_string(), command, timeout_secs);
        config.rules = BuiltinAction::RunTests.rules();
        config.policy = BuiltinAction::RunTests.policy();
        config.halt_on_failure = false;
        config
    }

    /// Disable this action.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
