//! API error types and JSON response formatting.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::Error;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details in the response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that converts to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Request body is not valid JSON.
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_JSON", message)
    }

    /// No route matches the request.
    pub fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found")
    }

    /// Internal server error. Never carries internal detail.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log server errors at error level, client errors at debug level
        if self.status.is_server_error() {
            error!(
                status = %self.status.as_u16(),
                code = %self.code,
                message = %self.message,
                "server error response"
            );
        } else if self.status.is_client_error() {
            debug!(
                status = %self.status.as_u16(),
                code = %self.code,
                message = %self.message,
                "client error response"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = err.code();
        match err {
            Error::InvalidInput(message) => Self::new(StatusCode::BAD_REQUEST, code, message),
            Error::NotFound(id) => Self::new(StatusCode::NOT_FOUND, code, "Document not found")
                .with_details(serde_json::json!({ "id": id })),
            Error::LockTimeout { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                code,
                "Document is busy, retry later",
            ),
            // Paths and OS error text stay in the service log.
            Error::MalformedRecord { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "Stored document could not be read",
            ),
            Error::StorageFailure(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "Storage operation failed",
            ),
            Error::Internal(_) => Self::internal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};

    /// Counts error-level events.
    struct ErrorEvents(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_server_error_logged_once_per_response() {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorEvents(Arc::clone(&count)));

        tracing::subscriber::with_default(subscriber, || {
            let errors = [
                Error::MalformedRecord {
                    key: "k".into(),
                    reason: "eof".into(),
                },
                Error::internal("boom"),
            ];
            for err in errors {
                let _ = ApiError::from(err).into_response();
            }
        });

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidInput("no data".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("k".into()), StatusCode::NOT_FOUND),
            (
                Error::LockTimeout {
                    key: "k".into(),
                    waited: std::time::Duration::from_secs(5),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::MalformedRecord {
                    key: "k".into(),
                    reason: "eof".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_storage_failure_hides_paths() {
        let err: Error = BackendError::io(
            "/mnt/efs/json-storage/secret.json",
            std::io::Error::other("permission denied"),
        )
        .into();
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, "STORAGE_FAILURE");
        assert!(!api.message.contains("/mnt/efs"));
        assert!(!api.message.contains("permission denied"));
    }
}
