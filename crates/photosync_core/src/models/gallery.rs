//! Folder snapshots: file entries, gallery state and change fingerprints.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One image file inside a scanned folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileEntry(String);

impl FileEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileEntry {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FileEntry {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What the client believes the server's folder looks like.
///
/// Never mutated after construction; a rescan produces a new value that is
/// swapped in whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GalleryState {
    files: Vec<FileEntry>,
    current: Option<FileEntry>,
}

impl GalleryState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a state from server-ordered files.
    ///
    /// A `current` that is not one of `files` is dropped so the state can
    /// never point at a missing file.
    pub fn new(files: Vec<FileEntry>, current: Option<FileEntry>) -> Self {
        let current = current.filter(|entry| files.contains(entry));
        Self { files, current }
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn current(&self) -> Option<&FileEntry> {
        self.current.as_ref()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|entry| entry.name() == name)
    }

    /// Last file in server order. The server lists folders sorted by name,
    /// and tethered cameras number their shots, so the tail is the newest.
    pub fn newest(&self) -> Option<&FileEntry> {
        self.files.last()
    }

    /// Same files with a different current file, or `None` when `name` is
    /// not part of this state.
    pub fn with_current(&self, name: &str) -> Option<Self> {
        let entry = self.files.iter().find(|entry| entry.name() == name)?;
        Some(Self {
            files: self.files.clone(),
            current: Some(entry.clone()),
        })
    }
}

/// Opaque change-detection token for one folder, compared for equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FolderFingerprint(String);

impl FolderFingerprint {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Servers report either a string token or a bare number (e.g. `0` when no
// folder is active); both collapse to their textual form.
impl<'de> Deserialize<'de> for FolderFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Integer(value) => Self(value.to_string()),
            Raw::Float(value) => Self(value.to_string()),
        })
    }
}

/// A fresh folder listing plus the server's opinion of the current file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub files: Vec<FileEntry>,
    pub current_hint: Option<FileEntry>,
}

impl ScanResult {
    pub fn new<I, T>(files: I, current_hint: Option<&str>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FileEntry>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            current_hint: current_hint.map(FileEntry::new),
        }
    }
}

/// What the gallery pane should show for a given state.
///
/// `Empty` and `NoSelection` both put the editor in its empty state; they
/// differ only in whether the thumbnail strip has anything to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryView {
    /// Folder has no images; wait for new shots.
    Empty,
    /// Images exist but none is being edited (the edited file vanished).
    NoSelection,
    /// A current file is being edited and previewed.
    Active,
}

impl GalleryView {
    pub fn of(state: &GalleryState) -> Self {
        if state.is_empty() {
            Self::Empty
        } else if state.current().is_none() {
            Self::NoSelection
        } else {
            Self::Active
        }
    }

    /// Whether the editor shows its empty state (no preview, nothing to edit).
    pub fn shows_empty_state(self) -> bool {
        !matches!(self, Self::Active)
    }
}
