//! API error types and response formatting.
//!
//! Only the query routes can fail. The body follows the status payload
//! shape with `success: false`, so clients branch on one field.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error type that converts to appropriate HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The event log could not be read.
    #[error("event log error: {0}")]
    Log(#[from] opentrack_log::Error),

    /// Internal server error (task failure, etc.).
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Log(err) => {
                tracing::error!(error = %err, "event log error");
                "Event log is unavailable"
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                "An internal error occurred"
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message.to_string(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
