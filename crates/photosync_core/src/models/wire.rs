//! Request and response bodies exchanged with the image server.

use super::edit::EditConfig;
use super::gallery::{FolderFingerprint, ScanResult};
use super::job::{BatchOutcome, ExportFormat, ProcessJob, ProcessMode};
use serde::{Deserialize, Serialize};

/// Whether a `status` field reports success. Absent statuses count as success
/// because some endpoints only answer with their payload.
pub fn status_is_ok(status: Option<&str>) -> bool {
    match status {
        None => true,
        Some(value) => matches!(value.trim().to_ascii_lowercase().as_str(), "ok" | "success"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCurrentRequest {
    pub filename: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl ScanResponse {
    pub fn into_scan_result(self) -> ScanResult {
        ScanResult::new(self.files, self.current_file.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckUpdatesResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub changed: bool,
    #[serde(default)]
    pub hash: Option<FolderFingerprint>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Parsed fingerprint check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderStatus {
    pub fingerprint: Option<FolderFingerprint>,
    /// The server's own change verdict, used only when no fingerprint is sent.
    pub changed: bool,
    /// Listing piggybacked on the check, sparing a separate scan.
    pub snapshot: Option<ScanResult>,
}

impl From<CheckUpdatesResponse> for FolderStatus {
    fn from(value: CheckUpdatesResponse) -> Self {
        let current = value.current_file;
        Self {
            fingerprint: value.hash,
            changed: value.changed,
            snapshot: value
                .files
                .map(|files| ScanResult::new(files, current.as_deref())),
        }
    }
}

/// Subdirectory listing used by the folder explorer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub current: Option<String>,
}

impl DirListing {
    /// Whether an "up" entry should be offered.
    pub fn has_parent(&self) -> bool {
        !self.parent.is_empty()
    }

    /// Join `base` and a listed child name.
    ///
    /// Keeps whichever separator `base` already uses; bare drive roots and
    /// backslash paths get `\`, everything else `/`. An empty base yields the
    /// child itself (drive letters at the top level).
    pub fn child_path(base: &str, child: &str) -> String {
        if base.is_empty() {
            return child.to_string();
        }
        if base.ends_with('\\') || base.ends_with('/') {
            return format!("{}{}", base, child);
        }
        let separator = if base.contains('\\') || base.ends_with(':') {
            '\\'
        } else {
            '/'
        };
        format!("{}{}{}", base, separator, child)
    }
}

/// Wire form of a [`ProcessJob`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessBatchRequest {
    pub output_folder: String,
    pub config: EditConfig,
    pub mode: ProcessMode,
    pub delete_source: bool,
    pub format: ExportFormat,
    pub quality: u8,
    pub resize_w: u32,
}

impl From<&ProcessJob> for ProcessBatchRequest {
    fn from(job: &ProcessJob) -> Self {
        Self {
            output_folder: job.output_folder.clone(),
            config: job.config.clone(),
            mode: job.mode,
            delete_source: job.delete_source,
            format: job.export.format,
            quality: job.export.quality,
            resize_w: job.export.resize_width,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub processed: u32,
    #[serde(default)]
    pub errors: u32,
    #[serde(default)]
    pub msg: Option<String>,
}

impl BatchResponse {
    pub fn outcome(&self) -> BatchOutcome {
        BatchOutcome {
            processed: self.processed,
            errors: self.errors,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatermarkUploadResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetUploadTargetRequest {
    pub ip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetUploadTargetResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default, alias = "message")]
    pub error: Option<String>,
}
