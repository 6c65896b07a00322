//! Error types for the drift monitoring core

use thiserror::Error;

/// Result type alias for driftwatch operations
pub type Result<T> = std::result::Result<T, DriftwatchError>;

/// Main error type for the drift monitor
#[derive(Error, Debug)]
pub enum DriftwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Batch source exhausted")]
    ExhaustedSource,

    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for DriftwatchError {
    fn from(err: polars::error::PolarsError) -> Self {
        DriftwatchError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for DriftwatchError {
    fn from(err: serde_json::Error) -> Self {
        DriftwatchError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for DriftwatchError {
    fn from(err: reqwest::Error) -> Self {
        DriftwatchError::InferenceUnavailable(err.to_string())
    }
}
