//! Gatekeeper service — process error types.

use gatekeeper_core::error::DomainError;
use thiserror::Error;

use crate::config::ConfigError;

/// Startup and runtime errors for the service process.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A domain operation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Output could not be rendered.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Signal handling or other I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Some requested aggregates could not be inspected.
    #[error("{failed} of {requested} aggregates could not be inspected")]
    InspectFailed {
        /// Number of ids that failed.
        failed: usize,
        /// Number of ids requested.
        requested: usize,
    },
}
