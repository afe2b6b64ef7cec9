//! Data models for edit parameters, folder snapshots, jobs and wire bodies.

pub mod edit;
pub mod gallery;
pub mod job;
pub mod photo;
pub mod watermark;
pub mod wire;


pub use edit::{AspectRatio, ConfigValue, CropAnchor, EditConfig, EditControls, WatermarkPosition};
pub use gallery::{FileEntry, FolderFingerprint, GalleryState, GalleryView, ScanResult};
pub use job::{BatchOutcome, ExportFormat, ExportOptions, ProcessJob, ProcessMode};
pub use photo::{validate_upload_target, CapturedPhoto};
pub use watermark::{default_watermark, image_mime, validate_watermark_name};
pub use wire::{DirListing, FolderStatus};
