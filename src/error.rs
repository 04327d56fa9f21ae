//! Error types for the Tollgate service.

use thiserror::Error;

/// Main error type for Tollgate operations.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// The caller supplied a bad key or permit count
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The configured limit or window cannot be enforced
    #[error("Invalid rate limiter configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    ConfigLoad(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TollgateError {
    fn from(err: config::ConfigError) -> Self {
        TollgateError::ConfigLoad(err.to_string())
    }
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;
