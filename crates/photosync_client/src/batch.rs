//! Bulk edit/export jobs.

use crate::api::ImageServer;
use crate::error::ClientError;
use crate::gallery::Gallery;
use crate::protocol::SyncEvent;
use crossbeam_channel::Sender;
use photosync_core::models::{BatchOutcome, ProcessJob};
use photosync_core::{AppError, ReconcileCause};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Tracks whether the edit controls are usable.
///
/// Disabling hands out a [`ControlsGuard`]; controls come back when the guard
/// drops, so every exit path re-enables them exactly once.
#[derive(Clone)]
pub struct ControlsGate {
    enabled: Arc<AtomicBool>,
    events: Sender<SyncEvent>,
}

impl ControlsGate {
    pub fn new(events: Sender<SyncEvent>) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            events,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// # Errors
    /// Returns [`AppError::Validation`] when the controls are already disabled.
    pub fn disable(&self) -> Result<ControlsGuard, AppError> {
        if self
            .enabled
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::validation("a batch job is already running"));
        }
        let _ = self
            .events
            .send(SyncEvent::ControlsChanged { enabled: false });
        Ok(ControlsGuard { gate: self.clone() })
    }
}

#[must_use = "controls are re-enabled as soon as the guard drops"]
pub struct ControlsGuard {
    gate: ControlsGate,
}

impl Drop for ControlsGuard {
    fn drop(&mut self) {
        self.gate.enabled.store(true, Ordering::SeqCst);
        let _ = self
            .gate
            .events
            .send(SyncEvent::ControlsChanged { enabled: true });
    }
}

pub struct BatchOrchestrator<S> {
    server: Arc<S>,
    gallery: Arc<Gallery<S>>,
    gate: ControlsGate,
    events: Sender<SyncEvent>,
}

impl<S: ImageServer> BatchOrchestrator<S> {
    pub fn new(
        server: Arc<S>,
        gallery: Arc<Gallery<S>>,
        gate: ControlsGate,
        events: Sender<SyncEvent>,
    ) -> Self {
        Self {
            server,
            gallery,
            gate,
            events,
        }
    }

    pub fn gate(&self) -> &ControlsGate {
        &self.gate
    }

    /// Run `job` against the open folder.
    ///
    /// Validation happens before anything is sent. Controls stay disabled
    /// for the duration of the call. Jobs that delete their sources force a
    /// rescan afterwards whether or not the server call succeeded.
    ///
    /// # Errors
    /// Returns local validation failures, a concurrent-run rejection, or the
    /// server error.
    pub async fn run(&self, job: ProcessJob) -> Result<BatchOutcome, ClientError> {
        job.validate(self.gallery.folder().as_deref())?;
        let _controls = self.gate.disable()?;
        let started = Instant::now();
        info!(
            output = %job.output_folder,
            mode = ?job.mode,
            format = %job.export.format,
            delete_source = job.delete_source,
            "batch started"
        );

        let result = self.server.process_batch(&job).await;
        match &result {
            Ok(outcome) => {
                info!(
                    processed = outcome.processed,
                    errors = outcome.errors,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "batch finished"
                );
                let _ = self.events.send(SyncEvent::BatchFinished { outcome: *outcome });
            }
            Err(err) => {
                warn!(error = %err, "batch failed");
                let _ = self.events.send(SyncEvent::BatchFailed {
                    message: err.to_string(),
                });
            }
        }

        if job.delete_source {
            if let Err(err) = self.gallery.rescan(ReconcileCause::FolderChanged).await {
                warn!(error = %err, "rescan after batch failed");
                let _ = self.events.send(SyncEvent::ScanFailed {
                    message: err.to_string(),
                });
            }
        }
        result
    }
}
