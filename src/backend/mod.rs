//! Storage backend: key validation, on-disk layout, and locked file primitives.
//!
//! The backend knows nothing about documents. It moves opaque bytes in and
//! out of one file per [`Key`], holding an advisory lock on that key for the
//! duration of each operation.

mod error;
mod fs;
mod key;
mod lock;

pub use error::BackendError;
pub use fs::{BackendOptions, FsBackend};
pub use key::{Key, MAX_KEY_LEN};
pub use lock::{DEFAULT_LOCK_TIMEOUT, DEFAULT_POLL_INTERVAL, LockMode, LockOptions};
