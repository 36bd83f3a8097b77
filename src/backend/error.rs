//! Error types for the storage backend.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in backend operations.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Timed out after {waited:?} waiting for {mode} lock on {key}")]
    LockTimeout {
        key: String,
        mode: &'static str,
        waited: Duration,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
