//! HTTP error type for laudos-api
//!
//! Every failure leaves the service as `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use laudos_common::api::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or expired credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Resource not found or owned by another user (404)
    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with existing data (409)
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500), message is shown to the client
    #[error("{0}")]
    Internal(String),

    /// Database error, details are logged but not returned
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// laudos-common error
    #[error("Common error: {0}")]
    Common(#[from] laudos_common::Error),
}

const INTERNAL_MESSAGE: &str = "Erro interno do servidor";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Database(err) => {
                error!(error = %err, "Database error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
            ApiError::Common(laudos_common::Error::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            ApiError::Common(laudos_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Common(err) => {
                error!(error = %err, "Internal error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
