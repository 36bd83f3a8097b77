//! Document lifecycle operations.

use serde_json::Value;

use crate::backend::{BackendError, FsBackend, Key};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::logging::{debug, error, warn};

use super::types::{take_data, Document};

/// Attempts at allocating an unused key before giving up.
const CREATE_ATTEMPTS: usize = 3;

/// Create, get, update, and delete documents on top of an [`FsBackend`].
///
/// Holds no document state: every call goes to storage. Safe to share across
/// threads, and any number of services (in any number of processes) may run
/// against the same root.
#[derive(Debug, Clone)]
pub struct DocumentService {
    backend: FsBackend,
    writer_id: String,
}

impl DocumentService {
    /// Wrap an already opened backend.
    pub fn new(backend: FsBackend, writer_id: impl Into<String>) -> Self {
        Self {
            backend,
            writer_id: writer_id.into(),
        }
    }

    /// Open the storage root described by `config`, creating it if needed.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let backend = FsBackend::open(&config.root, config.backend_options())?;
        Ok(Self::new(backend, config.writer_id.clone()))
    }

    /// Identity stamped into `created_by` / `updated_by`.
    pub fn writer_id(&self) -> &str {
        &self.writer_id
    }

    pub fn backend(&self) -> &FsBackend {
        &self.backend
    }

    /// Store `payload.data` as a new document under a freshly generated key.
    pub fn create(&self, payload: Value) -> Result<Document> {
        observe("create", None, self.try_create(payload))
    }

    /// Load the document stored under `key`.
    pub fn get(&self, key: &str) -> Result<Document> {
        observe("get", Some(key), self.try_get(key))
    }

    /// Replace the body of the document under `key` with `payload.data`.
    pub fn update(&self, key: &str, payload: Value) -> Result<Document> {
        observe("update", Some(key), self.try_update(key, payload))
    }

    /// Remove the document under `key`.
    pub fn delete(&self, key: &str) -> Result<()> {
        observe("delete", Some(key), self.try_delete(key))
    }

    /// Whether a document is stored under `key`. Takes no lock.
    pub fn exists(&self, key: &str) -> Result<bool> {
        let key = Key::parse(key)?;
        Ok(self.backend.exists(&key))
    }

    fn try_create(&self, payload: Value) -> Result<Document> {
        let mut data = take_data(payload)?;

        for attempt in 1..=CREATE_ATTEMPTS {
            let document = Document::new(self.backend.generate_key(), data, &self.writer_id);
            let bytes = document.to_bytes()?;

            match self.backend.create_locked(&document.id, &bytes) {
                Ok(()) => {
                    debug!(key = %document.id, writer = %self.writer_id, "document created");
                    return Ok(document);
                }
                Err(BackendError::AlreadyExists(key)) => {
                    warn!(key = %key, attempt, "generated key already in use, regenerating");
                    data = document.data;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::internal(format!(
            "no unused key after {} attempts",
            CREATE_ATTEMPTS
        )))
    }

    fn try_get(&self, key: &str) -> Result<Document> {
        let key = Key::parse(key)?;
        let bytes = self.backend.read_locked(&key)?;
        Document::from_bytes(&key, &bytes)
    }

    fn try_update(&self, key: &str, payload: Value) -> Result<Document> {
        let key = Key::parse(key)?;
        if !self.backend.exists(&key) {
            return Err(Error::NotFound(key.to_string()));
        }
        let data = take_data(payload)?;

        let document = self.backend.read_modify_write_locked(&key, |current| {
            let mut document = Document::from_bytes(&key, current)?;
            document.replace_data(data, &self.writer_id);
            let bytes = document.to_bytes()?;
            Ok::<_, Error>((bytes, document))
        })?;

        debug!(key = %key, writer = %self.writer_id, "document updated");
        Ok(document)
    }

    fn try_delete(&self, key: &str) -> Result<()> {
        let key = Key::parse(key)?;
        self.backend.delete(&key)?;
        debug!(key = %key, "document deleted");
        Ok(())
    }
}

/// Log a failed operation at a level matching its class, then pass it on.
#[cfg_attr(not(feature = "logging"), allow(unused_variables))]
fn observe<T>(op: &'static str, key: Option<&str>, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        let key = key.unwrap_or("-");
        match err {
            Error::InvalidInput(_) | Error::NotFound(_) => {
                debug!(op, key, error = %err, "request rejected");
            }
            Error::LockTimeout { .. } => {
                warn!(op, key, error = %err, "lock contention");
            }
            Error::MalformedRecord { .. } => {
                error!(op, key, error = %err, "corrupted record");
            }
            Error::StorageFailure(_) | Error::Internal(_) => {
                error!(op, key, error = %err, "operation failed");
            }
        }
    }
    result
}
