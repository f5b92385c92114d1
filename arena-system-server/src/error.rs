//! System Server error taxonomy, wired to the `{detail, code}` wire shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("request rejected: {0}")]
    Validation(String),

    #[error("system does not support this prompt")]
    Unsupported,

    #[error("batch queue is full")]
    Busy,

    #[error("request timed out waiting in the batch queue")]
    BatchTimeout,

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ServerError::Unsupported => (StatusCode::UNPROCESSABLE_ENTITY, "unsupported"),
            ServerError::Busy => (StatusCode::SERVICE_UNAVAILABLE, "busy"),
            ServerError::BatchTimeout => (StatusCode::GATEWAY_TIMEOUT, "batch_timeout"),
            ServerError::GenerationFailed(_) => (StatusCode::BAD_GATEWAY, "generate_failed"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let body = ErrorBody {
            detail: self.to_string(),
            code,
        };
        if matches!(self, ServerError::Busy) {
            return (
                status,
                [(axum::http::header::RETRY_AFTER, "1")],
                Json(body),
            )
                .into_response();
        }
        (status, Json(body)).into_response()
    }
}
