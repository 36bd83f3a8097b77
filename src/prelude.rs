//! Convenient re-exports for common usage patterns.
//!
//! ```ignore
//! use docstore::prelude::*;
//!
//! let docs = DocumentService::open(&StoreConfig::new("/mnt/efs/json-storage"))?;
//! let doc = docs.create(serde_json::json!({"data": {"x": 1}}))?;
//! ```

pub use crate::backend::{BackendError, BackendOptions, FsBackend, Key, LockOptions};
pub use crate::config::StoreConfig;
pub use crate::document::{Document, DocumentService};
pub use crate::error::{Error, Result};
