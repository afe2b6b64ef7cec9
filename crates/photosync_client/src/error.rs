//! Error type for server access and session operations.

use photosync_core::AppError;
use thiserror::Error;

/// Everything that can go wrong between the client and the image server.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{action} failed ({status}): {message}")]
    Server {
        action: String,
        status: u16,
        message: String,
    },

    /// A 2xx response whose `status` field reports failure.
    #[error("{action} rejected: {message}")]
    Rejected { action: String, message: String },

    #[error("Unexpected response from {action}: {message}")]
    Decode { action: String, message: String },

    #[error(transparent)]
    Validation(#[from] AppError),

    #[error("Session is shutting down")]
    Stopped,
}

impl ClientError {
    pub fn rejected(action: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            action: action.to_string(),
            message: message.into(),
        }
    }

    /// Whether retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
