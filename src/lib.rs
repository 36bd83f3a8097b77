//! A minimal JSON document store on a shared filesystem.
//!
//! Each document lives in its own file under a storage root. Concurrent
//! access from any number of threads or processes is coordinated with
//! per-document advisory locks, and every write goes through a temp file
//! that is atomically renamed into place.
//!
//! # Quick Start
//!
//! ```no_run
//! use docstore::{DocumentService, StoreConfig};
//! use serde_json::json;
//!
//! # fn main() -> docstore::Result<()> {
//! let config = StoreConfig::new("/mnt/efs/json-storage").with_writer_id("node-a");
//! let docs = DocumentService::open(&config)?;
//!
//! let doc = docs.create(json!({"data": {"x": 1}}))?;
//! let doc = docs.update(doc.id.as_str(), json!({"data": {"x": 2}}))?;
//! assert_eq!(docs.get(doc.id.as_str())?.data, json!({"x": 2}));
//! docs.delete(doc.id.as_str())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`backend`] - Keys, on-disk layout, and locked file primitives
//! - [`document`] - The document record and lifecycle service
//! - [`server`] - HTTP adapter (requires `server` feature)
//!
//! # Feature Flags
//!
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable the `docstore` command-line binary
//! - `server` - Enable the HTTP API server and `docstore-server` binary
//! - `full` - Enable all features

pub mod backend;
mod config;
pub mod document;
mod error;
mod logging;
pub mod prelude;
#[cfg(feature = "server")]
pub mod server;

pub use config::{DEFAULT_ROOT, DEFAULT_WRITER_ID, StoreConfig};
pub use document::{Document, DocumentService};
pub use error::{Error, Result};
