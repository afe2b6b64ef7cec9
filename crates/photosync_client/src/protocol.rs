//! Events emitted by a running session for the UI layer to observe.

use crate::preview::PreviewImage;
use photosync_core::models::{BatchOutcome, GalleryState, GalleryView};
use std::sync::Arc;

/// Notifications from the session tasks.
///
/// Delivered over an unbounded channel; a UI drains them on its own schedule.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    GalleryUpdated {
        state: Arc<GalleryState>,
        view: GalleryView,
    },
    PreviewReady {
        image: PreviewImage,
    },
    /// The displayed preview was released because nothing is selected.
    PreviewCleared,
    PreviewFailed {
        message: String,
    },
    PollFailed {
        message: String,
    },
    ScanFailed {
        message: String,
    },
    ControlsChanged {
        enabled: bool,
    },
    BatchFinished {
        outcome: BatchOutcome,
    },
    BatchFailed {
        message: String,
    },
}
