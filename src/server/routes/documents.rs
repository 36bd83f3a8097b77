//! Document lifecycle handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;

use crate::{Document, Error};

use super::super::{error::ApiError, state::AppState};

/// Create a document from `{"data": ...}`.
pub async fn create_document(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let payload = parse_body(&body)?;
    let document = state.run(move |docs| docs.create(payload)).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Fetch a document.
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let document = state.run(move |docs| docs.get(&id)).await?;
    Ok(Json(document))
}

/// Replace a document's `data`.
pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Document>, ApiError> {
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(err) => {
            // A missing document is reported ahead of a bad body.
            let key = id.clone();
            if !state.run(move |docs| docs.exists(&key)).await? {
                return Err(Error::NotFound(id).into());
            }
            return Err(err);
        }
    };
    let document = state.run(move |docs| docs.update(&id, payload)).await?;
    Ok(Json(document))
}

/// Delete a document.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.run(move |docs| docs.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// An empty body is treated as `{}`, which the service then rejects for
/// lacking `data`.
fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid_json(format!("Invalid JSON in request body: {}", e)))
}
