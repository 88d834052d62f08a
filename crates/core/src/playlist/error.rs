use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors from writing a playlist manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Fatal
    }
}
