//! Error types for RateWatch

use thiserror::Error;

/// Result type alias using RateWatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for RateWatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Alert delivery failed after all attempts
    #[error("Alert delivery failed after {attempts} attempt(s): {message}")]
    Delivery {
        /// Attempts made before giving up
        attempts: u32,
        /// Error from the final attempt
        message: String,
    },

    /// Schedule error
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a delivery error
    pub fn delivery(attempts: u32, msg: impl Into<String>) -> Self {
        Self::Delivery {
            attempts,
            message: msg.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
