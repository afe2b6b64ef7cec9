//! Watermark library helpers.

use crate::constants::WATERMARK_EXTENSIONS;
use crate::error::AppError;

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Check a watermark file name before it is sent to the server.
///
/// The server saves uploads under this exact name inside its watermark
/// folder, so separators and extensions it would never list are refused.
pub fn validate_watermark_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("watermark file name is empty"));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(AppError::invalid_value("watermark", name));
    }
    match extension(name) {
        Some(ext) if WATERMARK_EXTENSIONS.contains(&ext.as_str()) => Ok(name),
        _ => Err(AppError::invalid_value("watermark", name)),
    }
}

/// Watermark to select after the library is refreshed: the first listed
/// one, and only while nothing is chosen yet.
pub fn default_watermark<'a>(chosen: Option<&str>, library: &'a [String]) -> Option<&'a str> {
    if chosen.is_some() {
        return None;
    }
    library.first().map(String::as_str)
}

/// MIME type for an image upload, by extension.
pub fn image_mime(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
