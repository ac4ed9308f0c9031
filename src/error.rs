//! Error types for the predictd service.

use std::result;
use thiserror::Error;

use crate::models::ModelError;
use crate::service::codec::CodecError;

/// A specialized Result type for predictd operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for process-level predictd operations.
///
/// Session-scoped failures never surface here; they are contained by the
/// connection handler and reported to the client instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a connection failed
    #[error("Accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model registry and classifier errors
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Request codec errors
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
