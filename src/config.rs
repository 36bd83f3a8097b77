//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::backend::{BackendOptions, DEFAULT_LOCK_TIMEOUT, DEFAULT_POLL_INTERVAL, LockOptions};

/// Default storage root when none is configured.
pub const DEFAULT_ROOT: &str = ".docstore";

/// Default writer identity stamped into `created_by` / `updated_by`.
pub const DEFAULT_WRITER_ID: &str = "docstore";

/// Settings consumed by [`DocumentService::open`](crate::DocumentService::open).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one file per document.
    pub root: PathBuf,
    /// Identity of this writer.
    pub writer_id: String,
    /// Upper bound on waiting for a record lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Delay between lock attempts while contended, in milliseconds.
    pub lock_poll_interval_ms: u64,
    /// fsync every write.
    pub sync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            writer_id: DEFAULT_WRITER_ID.to_string(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            lock_poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            sync: true,
        }
    }
}

impl StoreConfig {
    /// Configuration for `root` with default settings otherwise.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Set the writer identity.
    pub fn with_writer_id(mut self, writer_id: impl Into<String>) -> Self {
        self.writer_id = writer_id.into();
        self
    }

    /// Set the lock wait bound.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enable or disable fsync on writes.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub(crate) fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            lock: LockOptions {
                timeout: Duration::from_millis(self.lock_timeout_ms),
                // A zero interval would spin.
                poll_interval: Duration::from_millis(self.lock_poll_interval_ms.max(1)),
            },
            sync: self.sync,
        }
    }
}
