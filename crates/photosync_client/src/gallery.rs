//! Client view of the server-managed folder.
//!
//! The state lives in a `watch` channel of `Arc<GalleryState>`; readers grab
//! a snapshot, writers publish a whole new value. Merges are serialized by an
//! async mutex so a poll-driven rescan and a manual selection cannot
//! interleave their read-reconcile-publish steps.

use crate::api::ImageServer;
use crate::error::ClientError;
use crate::preview::PreviewControl;
use crate::protocol::SyncEvent;
use crossbeam_channel::Sender;
use photosync_core::models::{FileEntry, GalleryState, GalleryView, ScanResult};
use photosync_core::{reconcile, AppError, ReconcileCause, Reconciliation};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{info, warn};

pub struct Gallery<S> {
    server: Arc<S>,
    preview: PreviewControl,
    events: Sender<SyncEvent>,
    folder: Mutex<Option<String>>,
    state_tx: watch::Sender<Arc<GalleryState>>,
    merge_lock: tokio::sync::Mutex<()>,
}

impl<S: ImageServer> Gallery<S> {
    pub fn new(server: Arc<S>, preview: PreviewControl, events: Sender<SyncEvent>) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(GalleryState::empty()));
        Self {
            server,
            preview,
            events,
            folder: Mutex::new(None),
            state_tx,
            merge_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The folder being mirrored, if any.
    pub fn folder(&self) -> Option<String> {
        match self.folder.lock() {
            Ok(folder) => folder.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_folder(&self, folder: Option<String>) {
        match self.folder.lock() {
            Ok(mut slot) => *slot = folder,
            Err(poisoned) => *poisoned.into_inner() = folder,
        }
    }

    pub fn snapshot(&self) -> Arc<GalleryState> {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<GalleryState>> {
        self.state_tx.subscribe()
    }

    /// Make `path` the active folder and load it.
    ///
    /// The previous state is discarded first, so nothing from the old folder
    /// can be kept as "current".
    pub async fn open(&self, path: &str) -> Result<Reconciliation, ClientError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(AppError::validation("folder path is empty").into());
        }
        self.set_folder(Some(path.to_string()));
        {
            let _merge = self.merge_lock.lock().await;
            let previous = self.state_tx.send_replace(Arc::new(GalleryState::empty()));
            if !previous.is_empty() {
                self.preview.retarget(None)?;
                let _ = self.events.send(SyncEvent::GalleryUpdated {
                    state: self.snapshot(),
                    view: GalleryView::Empty,
                });
            }
        }
        info!(folder = path, "opening folder");
        self.rescan(ReconcileCause::FolderChanged).await
    }

    /// Forget the active folder and release the preview.
    pub async fn close(&self) {
        let _merge = self.merge_lock.lock().await;
        self.set_folder(None);
        let previous = self.state_tx.send_replace(Arc::new(GalleryState::empty()));
        let _ = self.preview.retarget(None);
        if !previous.is_empty() {
            let _ = self.events.send(SyncEvent::GalleryUpdated {
                state: self.snapshot(),
                view: GalleryView::Empty,
            });
        }
    }

    /// Scan the active folder and merge the result.
    ///
    /// # Errors
    /// Fails when no folder is open or the scan request fails; the published
    /// state is untouched in both cases.
    pub async fn rescan(&self, cause: ReconcileCause) -> Result<Reconciliation, ClientError> {
        let folder = self
            .folder()
            .ok_or_else(|| AppError::validation("no folder is open"))?;
        let scan = self.server.scan_folder(&folder).await?;
        self.merge(scan, cause).await
    }

    /// Reconcile `scan` against the current state and publish the result.
    pub async fn merge(
        &self,
        scan: ScanResult,
        cause: ReconcileCause,
    ) -> Result<Reconciliation, ClientError> {
        let _merge = self.merge_lock.lock().await;
        let previous = self.snapshot();
        let result = reconcile(&previous, scan, cause);

        if result.announce_current {
            if let Some(current) = result.state.current() {
                if let Err(err) = self.server.set_current(current.name()).await {
                    warn!(file = %current, error = %err, "failed to report current file");
                }
            }
        }

        let changed = result.state != *previous;
        if changed {
            let state = Arc::new(result.state.clone());
            self.state_tx.send_replace(state.clone());
            info!(
                files = result.state.len(),
                current = ?result.state.current().map(FileEntry::name),
                view = ?result.view,
                "gallery updated"
            );
            let _ = self.events.send(SyncEvent::GalleryUpdated {
                state,
                view: result.view,
            });
        }

        if result.view.shows_empty_state() {
            self.preview.retarget(None)?;
        } else if let Some(target) = result.preview_target.clone() {
            self.preview.retarget(Some(target))?;
        }
        Ok(result)
    }

    /// Make `name` the current file.
    ///
    /// # Errors
    /// Returns [`AppError::UnknownFile`] when `name` is not in the gallery and
    /// propagates a failed set-current call without changing local state.
    pub async fn select(&self, name: &str) -> Result<Arc<GalleryState>, ClientError> {
        let _merge = self.merge_lock.lock().await;
        let previous = self.snapshot();
        let next = previous
            .with_current(name)
            .ok_or_else(|| AppError::UnknownFile(name.to_string()))?;
        self.server.set_current(name).await?;

        let state = Arc::new(next);
        self.state_tx.send_replace(state.clone());
        let _ = self.events.send(SyncEvent::GalleryUpdated {
            state: state.clone(),
            view: GalleryView::of(&state),
        });
        self.preview.retarget(state.current().cloned())?;
        Ok(state)
    }
}
