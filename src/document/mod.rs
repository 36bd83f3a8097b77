//! Documents and the service that manages their lifecycle.

mod service;
mod types;

pub use service::DocumentService;
pub use types::{DATA_FIELD, Document};
