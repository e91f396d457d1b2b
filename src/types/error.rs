//! Error types for text-to-SQL operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for text-to-SQL operations.
pub type Result<T> = std::result::Result<T, Text2SqlError>;

/// Error type for prompt building, inference and configuration.
#[derive(Error, Debug)]
pub enum Text2SqlError {
    /// Missing or empty required field in a request
    #[error("{0}")]
    InvalidInput(String),

    /// Backend or model error during generation
    #[error("Inference failed ({backend}): {message}")]
    InferenceFailure {
        /// Backend name (`local` or `remote`)
        backend: &'static str,
        /// Message reported by the backend
        message: String,
    },

    /// Inference did not complete within the request timeout
    #[error("Inference timed out after {}s", .0.as_secs())]
    InferenceTimeout(Duration),

    /// Missing credential, model path or invalid config file
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML config parse error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl Text2SqlError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an inference failure for the given backend.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend name
    /// * `msg` - Backend message
    pub fn inference(backend: &'static str, msg: impl Into<String>) -> Self {
        Self::InferenceFailure {
            backend,
            message: msg.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if the error was caused by the caller.
    ///
    /// # Returns
    ///
    /// `true` for `InvalidInput`, `false` otherwise
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
