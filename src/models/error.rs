//! Error types for model loading and classification

use std::path::PathBuf;
use thiserror::Error;

/// Failure raised by a model registry or a classifier
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or corrupt model file {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("dimension mismatch: expected {expected} attributes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("class index {index} has no label")]
    UnknownLabel { index: usize },

    #[error("classification failed: {0}")]
    Classification(String),
}

impl ModelError {
    /// Create an invalid model error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        ModelError::Invalid(msg.into())
    }

    /// Create a classification error
    pub fn classification<S: Into<String>>(msg: S) -> Self {
        ModelError::Classification(msg.into())
    }

    /// Create a format error for the given file
    pub fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ModelError::Format {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
