//! Photobooth captures waiting to be uploaded.

use crate::error::AppError;
use chrono::{DateTime, Utc};

/// A captured frame held on the client until the server accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub id: u64,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedPhoto {
    pub fn new(id: u64, bytes: Vec<u8>) -> Self {
        Self {
            id,
            file_name: format!("foto_{}.jpg", id),
            bytes,
            captured_at: Utc::now(),
        }
    }
}

/// Check the photobooth upload target (host or `host:port`) before it is sent.
pub fn validate_upload_target(target: &str) -> Result<&str, AppError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(AppError::validation("no upload target server selected"));
    }
    if target.chars().any(char::is_whitespace) || target.contains('/') {
        return Err(AppError::invalid_value("target", target));
    }
    Ok(target)
}
