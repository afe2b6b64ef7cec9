//! Client-side sync and live-preview pipeline for the photosync image server.
//!
//! [`Workstation`] ties the pieces together; the individual components are
//! public for embedders that only need part of the pipeline.

pub mod api;
pub mod batch;
pub mod error;
pub mod gallery;
pub mod poller;
pub mod preview;
pub mod protocol;
pub mod session;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{HttpImageServer, ImageServer, PollTarget};
pub use batch::{BatchOrchestrator, ControlsGate, ControlsGuard};
pub use error::ClientError;
pub use gallery::Gallery;
pub use poller::{detect_change, FolderPoller, PollStats};
pub use preview::{HandleCounts, PreviewControl, PreviewImage, PreviewScheduler, PreviewStats};
pub use protocol::SyncEvent;
pub use session::Workstation;
pub use upload::PhotoQueue;
