//! Generator Client error taxonomy.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("system server unreachable")]
    Unreachable,

    #[error("request exceeded the total deadline")]
    Timeout,

    #[error("system server's batch queue timed out the request")]
    BatchTimeout,

    #[error("prompt rejected: {0}")]
    Rejected(String),

    #[error("system does not support this prompt")]
    Unsupported,

    #[error("system server internal error: {0}")]
    InternalServerError(String),
}

impl GenerateError {
    /// Retry only on `Unreachable`, `5xx` (here,
    /// `InternalServerError`), or `BatchTimeout`. Never on prompt-level (4xx)
    /// errors, and not on `Timeout` — the total deadline has already
    /// elapsed by the time that variant is produced.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerateError::Unreachable
                | GenerateError::InternalServerError(_)
                | GenerateError::BatchTimeout
        )
    }

    /// Whether this outcome should count toward the circuit breaker's
    /// consecutive-failure streak — only true connectivity failures do.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, GenerateError::Unreachable)
    }
}
