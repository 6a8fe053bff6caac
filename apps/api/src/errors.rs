use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// `NotFound` deliberately carries no detail: traversal attempts and plain
/// missing files must be indistinguishable in the response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid result id: {0}")]
    InvalidIdentifier(String),

    #[error("Result not found")]
    NotFound,

    #[error("Download token expired")]
    TokenExpired,

    #[error("Invalid download token: {0}")]
    InvalidToken(String),

    #[error("Queue write failed")]
    QueueWrite(#[source] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidIdentifier(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_RESULT_ID", msg.clone())
            }
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Result not found".to_string(),
            ),
            AppError::TokenExpired => (
                StatusCode::FORBIDDEN,
                "TOKEN_EXPIRED",
                "Download token expired".to_string(),
            ),
            AppError::InvalidToken(msg) => (StatusCode::FORBIDDEN, "INVALID_TOKEN", msg.clone()),
            AppError::QueueWrite(e) => {
                tracing::error!("Queue write error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "QUEUE_WRITE_FAILED",
                    "Failed to enqueue re-optimization request".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
