//! Error type shared by the file swap and the post-processing stages.

use std::path::PathBuf;
use thiserror::Error;

use crate::stage::{FetchError, TagError};
use crate::tool::ToolError;

/// Whether a failure is worth retrying at a higher level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Retryable,
    Fatal,
}

/// Errors raised while rewriting an item's file.
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// A stale temporary file could not be removed.
    #[error("Temporary file is locked: {path}")]
    ResourceLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file is empty or unreadable.
    #[error("Corrupt input {path}: {reason}")]
    CorruptInput { path: PathBuf, reason: String },

    /// The file to transform does not exist.
    #[error("Input file not found: {path}")]
    MissingInput { path: PathBuf },

    /// The transformation ran and failed. The original may be gone.
    #[error("Transform of {path} failed: {source}")]
    TransformFailed {
        path: PathBuf,
        #[source]
        source: Box<PostProcessError>,
    },

    /// The external tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Cover art could not be fetched or decoded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Tag library failure.
    #[error(transparent)]
    Tag(#[from] TagError),

    /// The item's state machine rejected a transition.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// No such item in the queue.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PostProcessError {
    pub fn corrupt_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn transform_failed(path: impl Into<PathBuf>, source: PostProcessError) -> Self {
        Self::TransformFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Classifies the error. Only plain I/O and network failures are retryable;
    /// everything else already exhausted its retries or cannot succeed.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Retryable,
            Self::Fetch(e) if e.is_retryable() => ErrorKind::Retryable,
            Self::TransformFailed { source, .. } => source.kind(),
            _ => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let locked = PostProcessError::ResourceLocked {
            path: PathBuf::from("/tmp/~a.mp3"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(locked.kind(), ErrorKind::Fatal);
        assert_eq!(
            PostProcessError::corrupt_input("/a.mp3", "empty").kind(),
            ErrorKind::Fatal
        );

        let io = PostProcessError::Io(std::io::Error::from(std::io::ErrorKind::Interrupted));
        assert!(io.is_retryable());

        let wrapped = PostProcessError::transform_failed(
            "/a.mp3",
            PostProcessError::Tool(ToolError::Failed {
                code: Some(1),
                attempts: 3,
                stderr: String::new(),
            }),
        );
        assert_eq!(wrapped.kind(), ErrorKind::Fatal);
    }
}
