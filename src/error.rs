//! Error type surfaced by the document service.
//!
//! [`Error`] is the taxonomy callers see. Backend failures are classified
//! into it by the [`From<BackendError>`] conversion; adapters map each
//! variant to a transport status.

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;

/// Errors returned by [`DocumentService`](crate::DocumentService) operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The request payload or key is malformed or incomplete.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No record exists for the key.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Persisted bytes do not form a valid document.
    #[error("Malformed record {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    /// Locking, reading, or writing the record failed.
    #[error("Storage failure: {0}")]
    StorageFailure(#[source] BackendError),

    /// The record's lock was held by someone else for too long.
    #[error("Timed out after {waited:?} waiting for lock on {key}")]
    LockTimeout { key: String, waited: Duration },

    /// Anything not covered above.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A [`Result`] type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn malformed(key: impl ToString, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an internal error from any message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable name of the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::MalformedRecord { .. } => "MALFORMED_RECORD",
            Self::StorageFailure(_) => "STORAGE_FAILURE",
            Self::LockTimeout { .. } => "LOCK_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns `true` for ordinary outcomes caused by the caller's request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }

    /// Returns `true` if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is an invalid-input error.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidKey { .. } => Self::InvalidInput(err.to_string()),
            BackendError::NotFound(key) => Self::NotFound(key),
            BackendError::LockTimeout { key, waited, .. } => Self::LockTimeout { key, waited },
            // Keys are fresh on create; a clash means the generator misbehaved.
            BackendError::AlreadyExists(key) => {
                Self::Internal(format!("generated key {} already in use", key))
            }
            BackendError::Io { .. } => Self::StorageFailure(err),
        }
    }
}
