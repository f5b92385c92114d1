//! Shared error taxonomy for the routing/batching fabric.
//!
//! Each HTTP-facing crate (gateway, system server) wraps these in its own
//! `IntoResponse` impl; this enum only carries the machine-readable kind and
//! a human detail string, per the error shape in the wire spec.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "sqlite-store")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable error code used in the `{ detail, code }` wire shape.
    pub fn code(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite-store")]
            Error::Database(_) => "internal_error",
            Error::Io(_) => "internal_error",
            Error::Config(_) => "config_error",
            Error::NotFound(_) => "not_found",
            Error::InvalidInput(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::Internal(_) => "internal_error",
        }
    }
}
