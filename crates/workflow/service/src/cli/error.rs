//! CLI error types

use thiserror::Error;
use workflow_service::ServiceError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// IO error
    #[error("IO error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
