//! Photobooth capture queue.

use crate::api::ImageServer;
use crate::error::ClientError;
use photosync_core::models::{validate_upload_target, CapturedPhoto};
use photosync_core::AppError;
use tracing::{info, warn};

/// Captured photos waiting for upload.
///
/// Photos leave the queue only when the server accepted the whole upload or
/// the user removes them. Nothing is uploaded before a target server is chosen.
#[derive(Debug, Default)]
pub struct PhotoQueue {
    photos: Vec<CapturedPhoto>,
    next_id: u64,
    target: Option<String>,
}

impl PhotoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a captured frame and return its id.
    pub fn push(&mut self, bytes: Vec<u8>) -> u64 {
        self.next_id += 1;
        let photo = CapturedPhoto::new(self.next_id, bytes);
        let id = photo.id;
        self.photos.push(photo);
        id
    }

    /// Drop one photo; returns whether it was queued.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.photos.len();
        self.photos.retain(|photo| photo.id != id);
        self.photos.len() != before
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }

    pub fn photos(&self) -> &[CapturedPhoto] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// The server uploads are forwarded to, once confirmed.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Tell the photobooth server where to forward uploads.
    ///
    /// The previous target is kept when the server refuses the new one.
    pub async fn select_target<S: ImageServer>(
        &mut self,
        server: &S,
        target: &str,
    ) -> Result<&str, ClientError> {
        let target = validate_upload_target(target)?;
        let confirmed = server.set_upload_target(target).await?;
        info!(upload_target = %confirmed, "upload target selected");
        Ok(self.target.insert(confirmed).as_str())
    }

    /// Send every queued photo in one request.
    ///
    /// # Returns
    /// The number of photos the server stored; the queue is empty afterwards.
    ///
    /// # Errors
    /// An empty queue or a missing target is a validation error. On any
    /// server or transport failure the queue is left exactly as it was.
    pub async fn upload_all<S: ImageServer>(&mut self, server: &S) -> Result<u32, ClientError> {
        let Some(oldest) = self.photos.first() else {
            return Err(AppError::validation("no photos to upload").into());
        };
        if self.target.is_none() {
            return Err(AppError::validation("no upload target server selected").into());
        }
        let oldest = oldest.captured_at;
        match server.upload_photos(&self.photos).await {
            Ok(count) => {
                info!(
                    count,
                    queued = self.photos.len(),
                    oldest = %oldest.to_rfc3339(),
                    "photos uploaded"
                );
                self.photos.clear();
                Ok(count)
            }
            Err(err) => {
                warn!(queued = self.photos.len(), error = %err, "upload failed; keeping photos");
                Err(err)
            }
        }
    }
}
