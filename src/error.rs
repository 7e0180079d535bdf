//! Error types for the salary estimator

use crate::inference::ValidationError;
use thiserror::Error;

/// Result type alias for salary estimator operations
pub type Result<T> = std::result::Result<T, SalaryError>;

/// Main error type for the salary estimator
#[derive(Error, Debug)]
pub enum SalaryError {
    #[error("Data error: {0}")]
    DataError(String),

    /// Missing target, missing artifacts, broken rule tables. Never retried.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Training error: {0}")]
    TrainingError(String),

    /// A category that was not seen at fit time, with `HandleUnknown::Error`
    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for SalaryError {
    fn from(err: polars::error::PolarsError) -> Self {
        SalaryError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SalaryError {
    fn from(err: serde_json::Error) -> Self {
        SalaryError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for SalaryError {
    fn from(err: csv::Error) -> Self {
        SalaryError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SalaryError {
    fn from(err: ndarray::ShapeError) -> Self {
        SalaryError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
