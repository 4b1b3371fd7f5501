use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::resources::ResourceError;
use crate::store::StoreError;

/// Error returned by HTTP handlers
///
/// Rendered as `{"error": "<message>"}` with the matching status code.
/// Internal errors keep their detail for the server log and show only the
/// generic message to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}: {detail}")]
    Internal { message: &'static str, detail: String },
}

impl ApiError {
    pub fn internal(message: &'static str, detail: impl Display) -> Self {
        ApiError::Internal {
            message,
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal { message, detail } => {
                log::error!("{}: {}", message, detail);
                message.to_string()
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => message.clone(),
        };

        (self.status(), Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyTitle => ApiError::BadRequest("Title is required".to_string()),
            StoreError::NotFound(_) => ApiError::NotFound("Todo not found".to_string()),
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::UnsupportedExtension(_) => ApiError::BadRequest(err.to_string()),
            ResourceError::NotFound(_) => ApiError::NotFound("File not found".to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        log::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid request body".to_string())
    }
}

/// Parse an id path segment
///
/// Any integer is accepted. Ids are assigned from 1 upwards, so zero and
/// negative ids map to 0, which matches no record and ends in a 404.
///
/// # Errors
/// * `ApiError::BadRequest` with "Invalid ID" unless the segment is an integer
pub fn parse_id(raw: &str) -> Result<u64, ApiError> {
    let id = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest("Invalid ID".to_string()))?;
    Ok(u64::try_from(id).unwrap_or(0))
}

/// Lock shared state, turning a poisoned lock into a 500
pub fn lock<'a, T>(mutex: &'a Mutex<T>, message: &'static str) -> Result<MutexGuard<'a, T>, ApiError> {
    mutex.lock().map_err(|e| ApiError::internal(message, e))
}
