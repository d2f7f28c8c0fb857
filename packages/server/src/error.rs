//! Application-level error type returned by handlers.
//!
//! All variants serialise to the [`ErrorResponse`] JSON format and map to
//! the appropriate HTTP status code.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use socialgraph::ValidationError;
use socialgraph_api::error::{codes, ErrorResponse};

use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    InvalidJson(String),
    SelfFollow(String),
    AlreadyFollowing(String),
    Conflict(String),
    Validation(String),
    Internal(String),
    Forbidden(String),
    Unauthorized(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, codes::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_PARAMETER, msg),
            AppError::InvalidJson(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_JSON, msg),
            AppError::SelfFollow(msg) => (StatusCode::BAD_REQUEST, codes::SELF_FOLLOW, msg),
            AppError::AlreadyFollowing(msg) => {
                (StatusCode::CONFLICT, codes::ALREADY_FOLLOWING, msg)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, codes::CONFLICT, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, codes::VALIDATION_FAILED, msg),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR, msg)
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, codes::FORBIDDEN, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, msg),
        };
        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::SelfFollow(_) => AppError::SelfFollow(e.to_string()),
            StorageError::DuplicateEdge { .. } => AppError::AlreadyFollowing(e.to_string()),
            StorageError::NotFound => AppError::NotFound("not found".into()),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
            StorageError::Internal { kind, message } => {
                // Backend detail goes to the log only.
                tracing::error!(kind, %message, "storage failure");
                AppError::Internal("internal storage error".into())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidPage { .. } => AppError::BadRequest(e.to_string()),
            _ => AppError::Validation(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::InvalidJson(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}
