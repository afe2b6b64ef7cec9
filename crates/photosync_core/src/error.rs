//! Error types for models and local validation.
use thiserror::Error;

/// Top-level error type for the domain layer.
///
/// Everything here is raised locally, before any request leaves the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown file: {0}")]
    UnknownFile(String),
}

impl AppError {
    /// Shorthand for a [`AppError::Validation`] with a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`AppError::InvalidValue`].
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}
