//! Error taxonomy for the buildyard core.

/// Errors produced while preparing an invocation or compiling matchers.
///
/// Everything here is a setup-time failure: it aborts before any process
/// is launched. Once a process has terminated, the core always produces a
/// [`crate::verdict::Verdict`] instead of an error.
#[derive(Debug, thiserror::Error)]
pub enum BuildyardError {
    #[error("action {action} missing required parameter: {key}")]
    MissingParameter { action: String, key: String },

    #[error("invalid output pattern {pattern:?}: {source}")]
    PatternCompilation {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for buildyard core operations.
pub type Result<T> = std::result::Result<T, BuildyardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_display() {
        let err = BuildyardError::MissingParameter {
            action: "run-tests".to_string(),
            key: "working_dir".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("run-tests"));
        assert!(msg.contains("working_dir"));
    }

    #[test]
    fn test_pattern_compilation_display() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = BuildyardError::PatternCompilation {
            pattern: "(".to_string(),
            source,
        };
        assert!(err.to_string().contains("invalid output pattern"));
    }
}
