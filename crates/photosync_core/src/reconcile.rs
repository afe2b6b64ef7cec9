//! Merging a fresh folder scan into the previous gallery state.
//!
//! Pure functions only; the client crate owns the network calls and the
//! atomic swap of the resulting state.

use crate::models::{FileEntry, GalleryState, GalleryView, ScanResult};

/// Why a reconcile pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileCause {
    /// The folder contents changed (or were scanned for the first time).
    FolderChanged,
    /// The edit parameters changed; the current file must be re-rendered even
    /// when it stays the same.
    EditConfigChanged,
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub state: GalleryState,
    pub view: GalleryView,
    /// File to render a new preview for, when one is needed.
    pub preview_target: Option<FileEntry>,
    /// The current file is not the one the server named. A scan may reset the
    /// server's own current file without saying so, so it must be reported
    /// back before the server renders or exports anything.
    pub announce_current: bool,
}

impl Reconciliation {
    /// Whether the current file differs from `previous`.
    pub fn current_changed(&self, previous: &GalleryState) -> bool {
        self.state.current() != previous.current()
    }
}

/// Compute the next gallery state from `previous` and a fresh `scan`.
///
/// Current-file precedence:
/// 1. the server's hint, when it names a listed file;
/// 2. the previous current file, when still listed;
/// 3. nothing, when the previous current file vanished;
/// 4. otherwise the newest (last listed) file.
///
/// Server order is kept verbatim.
pub fn reconcile(
    previous: &GalleryState,
    scan: ScanResult,
    cause: ReconcileCause,
) -> Reconciliation {
    let ScanResult {
        files,
        current_hint,
    } = scan;

    if files.is_empty() {
        return Reconciliation {
            state: GalleryState::empty(),
            view: GalleryView::Empty,
            preview_target: None,
            announce_current: false,
        };
    }

    let hint = current_hint.filter(|entry| files.contains(entry));
    let previous_current = previous.current();
    let current = match (&hint, previous_current) {
        (Some(hinted), _) => Some(hinted.clone()),
        (None, Some(kept)) if files.contains(kept) => Some(kept.clone()),
        (None, Some(_vanished)) => None,
        (None, None) => files.last().cloned(),
    };
    let current_moved = current.as_ref() != previous_current;
    let announce_current = current.is_some() && current != hint;

    let state = GalleryState::new(files, current);
    let view = GalleryView::of(&state);
    let preview_target = match state.current() {
        Some(entry) if current_moved || cause == ReconcileCause::EditConfigChanged => {
            Some(entry.clone())
        }
        _ => None,
    };

    Reconciliation {
        state,
        view,
        preview_target,
        announce_current,
    }
}
