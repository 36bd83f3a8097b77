//! API routes and handlers.

mod documents;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use super::{error::ApiError, state::AppState};

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes());

    Router::new()
        .route("/", get(index).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        .route("/json", post(documents::create_document).fallback(not_found))
        .route(
            "/json/{id}",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document)
                .fallback(not_found),
        )
        .fallback(not_found)
        .layer(body_limit)
        .with_state(state)
}

/// Service description.
async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the JSON Storage API",
        "endpoints": {
            "GET /": "This message",
            "GET /health": "Health check",
            "POST /json": "Create new JSON document",
            "GET /json/{id}": "Get JSON document",
            "PUT /json/{id}": "Update JSON document",
            "DELETE /json/{id}": "Delete JSON document",
        }
    }))
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server_id": state.docs().writer_id(),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    }))
}

/// Unknown paths and unsupported methods alike.
async fn not_found() -> ApiError {
    ApiError::route_not_found()
}
