//! Gateway error taxonomy, wired to the `{detail, code}` wire shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request rejected: {0}")]
    Validation(String),

    #[error("prompt rejected by moderation: {0}")]
    PromptRejected(String),

    #[error("no systems support this prompt")]
    NoEligibleSystems,

    #[error("battle {0} not found")]
    NotFound(String),

    #[error("generation failed on side {0}")]
    GenerateFailed(String),

    #[error("listen time below the required minimum")]
    InsufficientListenTime,

    #[error("injected failure (flakiness)")]
    Flaky,

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    code: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            GatewayError::PromptRejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "prompt_rejected"),
            GatewayError::NoEligibleSystems => (StatusCode::CONFLICT, "no_eligible_systems"),
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            GatewayError::GenerateFailed(_) => (StatusCode::BAD_GATEWAY, "generate_failed"),
            GatewayError::InsufficientListenTime => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_listen_time")
            }
            GatewayError::Flaky => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let body = ErrorBody {
            detail: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

impl From<arena_registry::RegistryError> for GatewayError {
    fn from(err: arena_registry::RegistryError) -> Self {
        use arena_registry::RegistryError;
        match err {
            RegistryError::NoEligibleSystems => GatewayError::NoEligibleSystems,
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl From<arena_common::Error> for GatewayError {
    fn from(err: arena_common::Error) -> Self {
        match err {
            arena_common::Error::NotFound(detail) => GatewayError::NotFound(detail),
            arena_common::Error::Conflict(detail) => GatewayError::Internal(detail),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}
