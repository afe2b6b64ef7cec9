//! Batch export jobs.

use super::edit::EditConfig;
use crate::constants::DEFAULT_EXPORT_QUALITY;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which files a batch job touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    #[default]
    All,
    Current,
}

impl FromStr for ProcessMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "current" => Ok(Self::Current),
            _ => Err(AppError::invalid_value("mode", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "WEBP")]
    Webp,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Webp => "WEBP",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "JPEG" | "JPG" => Ok(Self::Jpeg),
            "PNG" => Ok(Self::Png),
            "WEBP" => Ok(Self::Webp),
            _ => Err(AppError::invalid_value("format", value)),
        }
    }
}

/// Output encoding for exported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// 1..=100.
    pub quality: u8,
    /// Downscale wider images to this width; `0` keeps the original size.
    pub resize_width: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            quality: DEFAULT_EXPORT_QUALITY,
            resize_width: 0,
        }
    }
}

/// One bulk edit/export request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessJob {
    pub output_folder: String,
    pub config: EditConfig,
    pub mode: ProcessMode,
    pub delete_source: bool,
    pub export: ExportOptions,
}

impl ProcessJob {
    /// Check the job locally before anything is sent to the server.
    ///
    /// # Arguments
    /// - `input_folder`: The folder currently being monitored, if any.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] when either folder is missing or the
    /// export quality is out of range.
    pub fn validate(&self, input_folder: Option<&str>) -> Result<(), AppError> {
        let has_input = input_folder.is_some_and(|folder| !folder.trim().is_empty());
        if !has_input || self.output_folder.trim().is_empty() {
            return Err(AppError::validation(
                "select both an input and an output folder first",
            ));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(AppError::validation(format!(
                "export quality must be between 1 and 100, got {}",
                self.export.quality
            )));
        }
        Ok(())
    }
}

/// Terminal result of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub processed: u32,
    pub errors: u32,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} processed, {} errors", self.processed, self.errors)
    }
}
