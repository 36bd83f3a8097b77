//! Application state management.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::DocumentService;

use super::config::Config;
use super::error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    docs: Arc<DocumentService>,
    max_body_bytes: usize,
}

impl AppState {
    /// Open the configured storage root.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let docs = DocumentService::open(&config.store).map_err(|source| StateError::OpenStore {
            path: config.store.root.clone(),
            source,
        })?;
        Ok(Self::new(docs, config.server.max_body_bytes))
    }

    pub fn new(docs: DocumentService, max_body_bytes: usize) -> Self {
        Self {
            docs: Arc::new(docs),
            max_body_bytes,
        }
    }

    pub fn docs(&self) -> &DocumentService {
        &self.docs
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Run a blocking document operation on the blocking thread pool.
    ///
    /// Lock waits never stall the async workers. A panic inside `op` is
    /// reported as a generic internal error.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&DocumentService) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let docs = Arc::clone(&self.docs);
        match tokio::task::spawn_blocking(move || op(&docs)).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(join_error) => {
                error!(error = %join_error, "document operation aborted");
                Err(ApiError::internal())
            }
        }
    }
}

/// Errors that can occur when setting up application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to open storage root '{}': {source}", path.display())]
    OpenStore {
        path: PathBuf,
        #[source]
        source: crate::Error,
    },
}
