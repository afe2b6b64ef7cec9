//! Shared constants used across photosync crates.

/// Default base URL for the image-processing server.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3300";

/// Quiet period before a burst of edit changes turns into one preview render.
pub const DEFAULT_PREVIEW_DEBOUNCE_MS: u64 = 100;

/// Interval between folder fingerprint checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default per-request timeout for server calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default JPEG/WEBP quality for batch exports.
pub const DEFAULT_EXPORT_QUALITY: u8 = 90;

/// Multipart field name used for photobooth uploads.
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Multipart field name for watermark image uploads.
pub const WATERMARK_FIELD_NAME: &str = "watermark";

/// Extensions the server lists as watermark images.
pub const WATERMARK_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];
