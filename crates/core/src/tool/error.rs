//! Error types for the tool module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Binary not found. Never retried.
    #[error("Tool not found at path: {path}")]
    NotFound { path: PathBuf },

    /// Every attempt exited non-zero.
    #[error("Tool failed after {attempts} attempt(s) with exit status {}", display_code(.code))]
    Failed {
        /// Last exit code, `None` if killed by a signal.
        code: Option<i32>,
        attempts: u32,
        stderr: String,
    },

    /// A leftover output file could not be removed before an attempt.
    #[error("Cannot remove existing output {path}: {source}")]
    OutputLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

impl ToolError {
    /// Exit code of the last failed attempt.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => *code,
            _ => None,
        }
    }

    /// Captured stderr of the last failed attempt.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_and_code() {
        let err = ToolError::Failed {
            code: Some(183),
            attempts: 3,
            stderr: "Invalid data".to_string(),
        };
        assert_eq!(err.exit_code(), Some(183));
        assert_eq!(err.stderr(), Some("Invalid data"));
        assert_eq!(
            err.to_string(),
            "Tool failed after 3 attempt(s) with exit status 183"
        );

        let killed = ToolError::Failed {
            code: None,
            attempts: 1,
            stderr: String::new(),
        };
        assert!(killed.to_string().ends_with("signal"));
    }
}
