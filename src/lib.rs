//! Root crate facade for the photosync client libraries.

pub use photosync_client::{
    api, batch, gallery, poller, preview, protocol, session, upload, ClientError, HttpImageServer,
    ImageServer, PhotoQueue, PollTarget, SyncEvent, Workstation,
};
pub use photosync_core::{config, constants, error, models, reconcile, AppError, Config};
