//! Error types for cover fetching and tag writing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching or re-encoding cover art.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cover request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The fetched bytes are not an image we can decode.
    #[error("Failed to decode cover image: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Network timeouts, refused connections and 5xx responses are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) => false,
            Self::Io(_) => true,
        }
    }
}

/// Errors reported by a [`TagEditor`](super::TagEditor).
#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to load tags from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Failed to save tags to {path}: {reason}")]
    Save { path: PathBuf, reason: String },

    #[error("Unsupported tag field {field}")]
    UnsupportedField { field: String },

    /// The blocking tag task panicked or was cancelled.
    #[error("Tag task failed: {0}")]
    Task(String),
}

impl TagError {
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn save(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Save {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
