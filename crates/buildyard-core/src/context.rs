//! Execution contexts: direct process launch vs. sandbox wrapper.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a command runs on a build host.
///
/// Chosen once per invocation and never mutated afterwards. The sandboxed
/// variant routes every command through a wrapper executable that presents
/// the sandbox root as the filesystem root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionContext {
    /// Run the command as-is on the host.
    Direct,

    /// Run the command through the sandbox wrapper.
    Sandboxed(SandboxProfile),
}

impl ExecutionContext {
    /// Whether this context routes commands through a wrapper.
    pub fn is_sandboxed(&self) -> bool {
        matches!(self, ExecutionContext::Sandboxed(_))
    }
}

/// Filesystem layout and flag spellings of the sandbox wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SandboxProfile {
    /// Path to the wrapper executable on the host.
    pub wrapper: PathBuf,

    /// Host path the wrapper presents as filesystem root.
    pub root: PathBuf,

    /// Host path of the builder home directory inside the sandbox.
    pub home: PathBuf,

    /// Flag that keeps the wrapper's output streaming to the caller.
    #[serde(default = "default_passthrough_flag")]
    pub passthrough_flag: String,

    /// Flag that carries the working directory, relative to `home`.
    #[serde(default = "default_chdir_flag")]
    pub chdir_flag: String,
}

fn default_passthrough_flag() -> String {
    "-p".to_string()
}

fn default_chdir_flag() -> String {
    "-d".to_string()
}

impl Default for SandboxProfile {
    fn default() -> Self {
        Self {
            wrapper: PathBuf::from("/sandbox/run"),
            root: PathBuf::from("/sandbox/users/builder"),
            home: PathBuf::from("/sandbox/users/builder/home/builder"),
            passthrough_flag: default_passthrough_flag(),
            chdir_flag: default_chdir_flag(),
        }
    }
}

impl SandboxProfile {
    /// Rewrite a working directory for the wrapper's chdir flag.
    ///
    /// Directories under `home` become relative to it; anything else is
    /// passed through unchanged (the wrapper resolves it itself).
    pub fn rewrite_cwd(&self, cwd: &Path) -> String {
        match cwd.strip_prefix(&self.home) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => cwd.to_string_lossy().into_owned(),
        }
    }

    /// Strip every literal occurrence of the sandbox root from a command
    /// string. Inside the wrapper the root *is* `/`.
    pub fn strip_root(&self, command: &str) -> String {
        command.replace(&self.root.to_string_lossy().into_owned(), "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_cwd_under_home() {
        let profile = SandboxProfile::default();
        let rewritten = profile.rewrite_cwd(Path::new("/sandbox/users/builder/home/builder/work"));
        assert_eq!(rewritten, "work");
        assert!(!rewritten.contains("/sandbox"));
    }

    #[test]
    fn test_rewrite_cwd_home_itself() {
        let profile = SandboxProfile::default();
        let rewritten = profile.rewrite_cwd(Path::new("/sandbox/users/builder/home/builder"));
        assert_eq!(rewritten, ".");
    }

    #[test]
    fn test_rewrite_cwd_outside_home_unchanged() {
        let profile = SandboxProfile::default();
        let rewritten = profile.rewrite_cwd(Path::new("/tmp/scratch"));
        assert_eq!(rewritten, "/tmp/scratch");
    }

    #[test]
    fn test_strip_root() {
        let profile = SandboxProfile::default();
        let stripped = profile.strip_root("make -C /sandbox/users/builder/obj package");
        assert_eq!(stripped, "make -C /obj package");
    }

    #[test]
    fn test_context_serde_roundtrip() {
        let ctx = ExecutionContext::Sandboxed(SandboxProfile::default());
        let json = serde_json::to_string(&ctx).expect("serialize");
        let back: ExecutionContext = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(ctx, back);
        assert!(back.is_sandboxed());
    }

    #[test]
    fn test_direct_context_serde() {
        let json = r#"{"mode":"direct"}"#;
        let ctx: ExecutionContext = serde_json::from_str(json).expect("deserialize");
        assert_eq!(ctx, ExecutionContext::Direct);
    }
}
