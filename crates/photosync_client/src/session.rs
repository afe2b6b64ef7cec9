//! The workstation application context.
//!
//! Owns every component of one editing session and wires them together:
//! control changes feed the preview scheduler, the poller feeds the gallery,
//! the gallery retargets the preview, and batch jobs may force a rescan.

use crate::api::{ImageServer, PollTarget};
use crate::batch::{BatchOrchestrator, ControlsGate};
use crate::error::ClientError;
use crate::gallery::Gallery;
use crate::poller::FolderPoller;
use crate::preview::{PreviewControl, PreviewScheduler};
use crate::protocol::SyncEvent;
use crossbeam_channel::Receiver;
use photosync_core::models::{
    default_watermark, validate_watermark_name, BatchOutcome, DirListing, EditConfig,
    EditControls, ExportOptions, GalleryState, ProcessJob, ProcessMode,
};
use photosync_core::{AppError, Config, ReconcileCause};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub struct Workstation<S: ImageServer> {
    server: Arc<S>,
    controls: EditControls,
    config_tx: watch::Sender<EditConfig>,
    gallery: Arc<Gallery<S>>,
    preview: PreviewScheduler,
    poller: FolderPoller<S>,
    batch: BatchOrchestrator<S>,
    output_folder: Option<String>,
    watermarks: Vec<String>,
    stateless_poll: bool,
    events: Receiver<SyncEvent>,
}

impl<S: ImageServer> Workstation<S> {
    /// Build the session and spawn its preview task.
    ///
    /// Must be called from within a tokio runtime. No folder is open yet.
    pub fn new(server: S, config: &Config) -> Self {
        let server = Arc::new(server);
        let (evt_tx, events) = crossbeam_channel::unbounded();
        let controls = EditControls::default();
        let (config_tx, config_rx) = watch::channel(controls.build_config());
        let preview = PreviewScheduler::spawn(
            server.clone(),
            config_rx,
            config.preview_debounce(),
            evt_tx.clone(),
        );
        let gallery = Arc::new(Gallery::new(
            server.clone(),
            preview.control().clone(),
            evt_tx.clone(),
        ));
        let poller = FolderPoller::new(
            server.clone(),
            gallery.clone(),
            evt_tx.clone(),
            config.poll_interval(),
        );
        let batch = BatchOrchestrator::new(
            server.clone(),
            gallery.clone(),
            ControlsGate::new(evt_tx.clone()),
            evt_tx,
        );
        Self {
            server,
            controls,
            config_tx,
            gallery,
            preview,
            poller,
            batch,
            output_folder: None,
            watermarks: Vec::new(),
            stateless_poll: config.stateless_poll,
            events,
        }
    }

    pub fn events(&self) -> &Receiver<SyncEvent> {
        &self.events
    }

    /// Open `path` as the input folder and start monitoring it.
    ///
    /// # Errors
    /// Propagates the initial scan failure; monitoring is not started then.
    pub async fn open_folder(&mut self, path: &str) -> Result<Arc<GalleryState>, ClientError> {
        self.poller.stop_monitoring();
        self.gallery.open(path).await?;
        let target = if self.stateless_poll {
            PollTarget::Folder(path.trim().to_string())
        } else {
            PollTarget::ServerContext
        };
        self.poller.start_monitoring(target);
        Ok(self.gallery.snapshot())
    }

    pub async fn close_folder(&mut self) {
        self.poller.stop_monitoring();
        self.gallery.close().await;
    }

    pub fn folder(&self) -> Option<String> {
        self.gallery.folder()
    }

    pub fn gallery(&self) -> Arc<GalleryState> {
        self.gallery.snapshot()
    }

    pub fn subscribe_gallery(&self) -> watch::Receiver<Arc<GalleryState>> {
        self.gallery.subscribe()
    }

    /// Force a rescan of the open folder, re-rendering the current file.
    pub async fn refresh(&self) -> Result<Arc<GalleryState>, ClientError> {
        self.gallery.rescan(ReconcileCause::EditConfigChanged).await?;
        Ok(self.gallery.snapshot())
    }

    pub fn controls(&self) -> &EditControls {
        &self.controls
    }

    pub fn config(&self) -> EditConfig {
        self.config_tx.borrow().clone()
    }

    /// Apply one control change and publish the resulting config.
    ///
    /// Every successful change restarts the preview debounce window.
    ///
    /// # Errors
    /// Rejected while a batch job holds the controls, or when `change` fails;
    /// nothing is published in either case.
    pub fn update_controls<R, F>(&mut self, change: F) -> Result<R, ClientError>
    where
        F: FnOnce(&mut EditControls) -> Result<R, AppError>,
    {
        if !self.batch.gate().is_enabled() {
            return Err(AppError::validation("controls are disabled while a batch job runs").into());
        }
        let mut next = self.controls.clone();
        let value = change(&mut next)?;
        self.controls = next;
        self.config_tx.send_replace(self.controls.build_config());
        Ok(value)
    }

    pub fn controls_enabled(&self) -> bool {
        self.batch.gate().is_enabled()
    }

    pub async fn select(&self, filename: &str) -> Result<Arc<GalleryState>, ClientError> {
        self.gallery.select(filename).await
    }

    pub fn set_output_folder(&mut self, folder: Option<&str>) {
        self.output_folder = folder
            .map(str::trim)
            .filter(|folder| !folder.is_empty())
            .map(str::to_string);
    }

    pub fn output_folder(&self) -> Option<&str> {
        self.output_folder.as_deref()
    }

    /// Export the open folder (or just the current file) with the current edits.
    pub async fn run_batch(
        &self,
        mode: ProcessMode,
        delete_source: bool,
        export: ExportOptions,
    ) -> Result<BatchOutcome, ClientError> {
        let job = ProcessJob {
            output_folder: self.output_folder.clone().unwrap_or_default(),
            config: self.config(),
            mode,
            delete_source,
            export,
        };
        self.batch.run(job).await
    }

    /// Watermarks seen by the last [`Workstation::refresh_watermarks`].
    pub fn watermarks(&self) -> &[String] {
        &self.watermarks
    }

    /// Reload the server's watermark library.
    ///
    /// When no watermark is chosen yet the first one is selected, which
    /// re-renders the preview. That selection is skipped while a batch holds
    /// the controls.
    pub async fn refresh_watermarks(&mut self) -> Result<&[String], ClientError> {
        self.watermarks = self.server.list_watermarks().await?;
        let pick = default_watermark(self.controls.watermark(), &self.watermarks)
            .map(str::to_string);
        if let Some(name) = pick {
            if self.controls_enabled() {
                info!(watermark = %name, "selecting first watermark");
                self.update_controls(|controls| {
                    controls.set_watermark(Some(&name));
                    Ok(())
                })?;
            }
        }
        Ok(&self.watermarks)
    }

    /// Add an image to the watermark library and reload it.
    ///
    /// # Errors
    /// Names the server would not list are rejected before any request.
    pub async fn upload_watermark(
        &mut self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        let filename = validate_watermark_name(filename)?;
        let saved = self.server.upload_watermark(filename, bytes).await?;
        self.refresh_watermarks().await?;
        Ok(saved)
    }

    pub async fn list_dirs(&self, path: &str) -> Result<DirListing, ClientError> {
        self.server.list_dirs(path).await
    }

    pub fn preview(&self) -> &PreviewControl {
        self.preview.control()
    }

    pub fn poller(&self) -> &FolderPoller<S> {
        &self.poller
    }

    /// Stop polling and the preview task, releasing the displayed image.
    pub async fn shutdown(mut self) {
        self.poller.stop_monitoring();
        self.preview.shutdown().await;
        info!("workstation session closed");
    }
}
