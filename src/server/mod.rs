//! HTTP API server for docstore.
//!
//! A thin adapter: each route decodes its request into one document
//! operation, runs it on the blocking pool, and maps the typed result to a
//! status code and JSON body.

mod config;
mod error;
mod logging;
mod routes;
mod state;

pub use config::{Config, ConfigError, LogFormat, LoggingConfig, ServerConfig};
pub use error::ApiError;
pub use logging::{LoggingError, init as init_logging};
pub use routes::router;
pub use state::{AppState, StateError};
