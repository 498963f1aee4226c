//! Request-level error type and conversions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io::ErrorKind;

use crate::storage::StorageError;
use crate::upload::UploadError;

/// Per-request failure, mapped onto an HTTP status at the routing boundary.
/// Nothing here ever takes the process down.
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::PathEscape => ApiError::Forbidden("Access denied".into()),
            StorageError::Io(err) => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound(err.to_string()),
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::MissingBoundary => {
                ApiError::BadRequest("Content does not start with boundary".into())
            }
            UploadError::MissingFilename => ApiError::BadRequest("Filename not found".into()),
            UploadError::UnexpectedEnd => {
                ApiError::BadRequest("body ended before closing boundary".into())
            }
            UploadError::Io(err) => ApiError::Internal(err.to_string()),
        }
    }
}
