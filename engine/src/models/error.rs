use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for the analysis engine.
///
/// Per-file failures (unreadable files, syntax errors) are not errors at this
/// level; they are recorded in the affected `FileRecord` and the run continues.
#[derive(Error, Debug)]
pub enum XrayError {
    #[error("target path does not exist or is not a directory: {path}")]
    InvalidTarget { path: PathBuf },

    #[error("invalid configuration in {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("git executable unavailable or target is not a repository")]
    GitUnavailable,

    #[error("git invocation exceeded the {seconds}s wall-clock bound")]
    GitTimeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl XrayError {
    /// Process exit code for the CLI surface.
    ///
    /// 0 success, 1 invalid arguments/config, 2 target not found, 3 internal.
    pub fn exit_code(&self) -> i32 {
        match self {
            XrayError::InvalidTarget { .. } => 2,
            XrayError::ConfigInvalid { .. } => 1,
            _ => 3,
        }
    }

    /// Soft errors degrade a single analysis section instead of the run.
    pub fn is_soft(&self) -> bool {
        matches!(self, XrayError::GitUnavailable | XrayError::GitTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_cli_contract() {
        let invalid = XrayError::InvalidTarget {
            path: PathBuf::from("/nope"),
        };
        assert_eq!(invalid.exit_code(), 2);

        let config = XrayError::ConfigInvalid {
            path: PathBuf::from("xray.toml"),
            reason: "bad toml".into(),
        };
        assert_eq!(config.exit_code(), 1);

        assert_eq!(XrayError::Internal("bug".into()).exit_code(), 3);
    }

    #[test]
    fn git_failures_are_soft() {
        assert!(XrayError::GitUnavailable.is_soft());
        assert!(XrayError::GitTimeout { seconds: 60 }.is_soft());
        assert!(!XrayError::Internal("bug".into()).is_soft());
    }
}
