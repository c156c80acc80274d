//! Job identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Identity of one pipeline run on one host.
///
/// The action digest pins the ordered action list, so two jobs with the
/// same digest ran the same steps in the same order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSpec {
    /// Workspace root path on the build host.
    pub workspace_path: PathBuf,

    /// SHA-256 digest of the ordered action names.
    pub actions_digest: String,

    /// Source revision being built/tested.
    pub revision: String,

    /// Platform label for the reporting side (e.g. "linux64").
    pub platform: String,
}

impl JobSpec {
    /// Create a new job specification.
    pub fn new(
        workspace_path: PathBuf,
        actions: &[String],
        revision: String,
        platform: String,
    ) -> Self {
        let actions_digest = compute_actions_digest(actions);
        Self {
            workspace_path,
            actions_digest,
            revision,
            platform,
        }
    }
}

/// Compute a deterministic digest of ordered action names.
fn compute_actions_digest(actions: &[String]) -> String {
    let mut hasher = Sha256::new();
    for action in actions {
        hasher.update(action.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_spec_new() {
        let actions = vec!["build".to_string(), "package".to_string()];
        let spec = JobSpec::new(
            PathBuf::from("/builds/work"),
            &actions,
            "4f6a2e9".to_string(),
            "linux64".to_string(),
        );
        assert_eq!(spec.revision, "4f6a2e9");
        assert_eq!(spec.platform, "linux64");
        assert!(!spec.actions_digest.is_empty());
    }

    #[test]
    fn test_actions_digest_deterministic() {
        let actions = vec!["build".to_string(), "package".to_string()];
        assert_eq!(
            compute_actions_digest(&actions),
            compute_actions_digest(&actions)
        );
    }

    #[test]
    fn test_actions_digest_order_sensitive() {
        let forward = vec!["build".to_string(), "package".to_string()];
        let backward = vec!["package".to_string(), "build".to_string()];
        assert_ne!(
            compute_actions_digest(&forward),
            compute_actions_digest(&backward)
        );
    }
}
