//! Application error type mapping to HTTP status codes and envelope format.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// The request body is not a valid update.
    InvalidUpdate(String),
    /// The server is draining and accepts no more updates.
    ShuttingDown,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidUpdate(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidUpdate(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_UPDATE", msg.clone())
            }
            AppError::ShuttingDown => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SHUTTING_DOWN",
                "Server is shutting down".to_string(),
            ),
        };
        tracing::debug!(%status, code, %message, "request rejected");

        ApiResponse::error(status, code, &message, String::new(), 0).into_response()
    }
}
