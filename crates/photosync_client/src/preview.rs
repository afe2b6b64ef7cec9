//! Debounced live preview rendering.
//!
//! A single actor task owns the debounce timer, the identity of the last
//! issued render and the displayed image. Commands and config changes arrive
//! over channels; render calls run as child tasks and report back through a
//! [`JoinSet`], so no lock is ever held across a request.

use crate::api::ImageServer;
use crate::error::ClientError;
use crate::protocol::SyncEvent;
use crossbeam_channel::Sender;
use photosync_core::models::{EditConfig, FileEntry};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Rendered preview bytes as shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub request_id: u64,
    pub target: FileEntry,
    pub bytes: Arc<[u8]>,
}

/// Live/released counters for displayed preview handles.
#[derive(Debug, Default)]
struct HandleLedger {
    created: AtomicUsize,
    released: AtomicUsize,
}

/// Snapshot of [`HandleLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleCounts {
    pub created: usize,
    pub released: usize,
}

impl HandleCounts {
    pub fn live(&self) -> usize {
        self.created.saturating_sub(self.released)
    }
}

/// The scheduler's owned reference to the displayed image. Dropping it
/// releases the image; this happens exactly once per handle.
struct DisplayedPreview {
    image: PreviewImage,
    ledger: Arc<HandleLedger>,
}

impl DisplayedPreview {
    fn new(image: PreviewImage, ledger: Arc<HandleLedger>) -> Self {
        ledger.created.fetch_add(1, Ordering::SeqCst);
        Self { image, ledger }
    }
}

impl Drop for DisplayedPreview {
    fn drop(&mut self) {
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
        debug!(request_id = self.image.request_id, "released preview image");
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    issued: AtomicU64,
    applied: AtomicU64,
    stale_discarded: AtomicU64,
    failed: AtomicU64,
    skipped_no_target: AtomicU64,
}

/// Render counters since the scheduler started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewStats {
    pub issued: u64,
    pub applied: u64,
    pub stale_discarded: u64,
    pub failed: u64,
    pub skipped_no_target: u64,
}

enum PreviewCmd {
    Schedule,
    Retarget(Option<FileEntry>),
    Shutdown,
}

/// Cloneable handle for steering the scheduler.
#[derive(Clone)]
pub struct PreviewControl {
    cmd_tx: mpsc::UnboundedSender<PreviewCmd>,
    image_rx: watch::Receiver<Option<PreviewImage>>,
    stats: Arc<StatsCounters>,
    ledger: Arc<HandleLedger>,
}

impl PreviewControl {
    /// Restart the debounce window.
    ///
    /// # Errors
    /// Returns [`ClientError::Stopped`] once the scheduler has exited.
    pub fn schedule(&self) -> Result<(), ClientError> {
        self.send(PreviewCmd::Schedule)
    }

    /// Point the scheduler at a new file, or at nothing.
    ///
    /// Either way, renders still in flight become stale. A new target also
    /// restarts the debounce window; `None` releases the displayed image.
    pub fn retarget(&self, target: Option<FileEntry>) -> Result<(), ClientError> {
        self.send(PreviewCmd::Retarget(target))
    }

    pub fn current_image(&self) -> Option<PreviewImage> {
        self.image_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PreviewImage>> {
        self.image_rx.clone()
    }

    pub fn stats(&self) -> PreviewStats {
        PreviewStats {
            issued: self.stats.issued.load(Ordering::Relaxed),
            applied: self.stats.applied.load(Ordering::Relaxed),
            stale_discarded: self.stats.stale_discarded.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            skipped_no_target: self.stats.skipped_no_target.load(Ordering::Relaxed),
        }
    }

    pub fn handle_counts(&self) -> HandleCounts {
        HandleCounts {
            created: self.ledger.created.load(Ordering::SeqCst),
            released: self.ledger.released.load(Ordering::SeqCst),
        }
    }

    fn send(&self, cmd: PreviewCmd) -> Result<(), ClientError> {
        self.cmd_tx.send(cmd).map_err(|_| ClientError::Stopped)
    }
}

/// Owner of the scheduler task.
pub struct PreviewScheduler {
    control: PreviewControl,
    task: JoinHandle<()>,
}

impl PreviewScheduler {
    /// Spawn the scheduler on the current tokio runtime.
    ///
    /// `config_rx` is the only consumer of edit-config changes; every change
    /// restarts the debounce window.
    pub fn spawn<S: ImageServer>(
        server: Arc<S>,
        config_rx: watch::Receiver<EditConfig>,
        debounce: Duration,
        events: Sender<SyncEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (image_tx, image_rx) = watch::channel(None);
        let stats = Arc::new(StatsCounters::default());
        let ledger = Arc::new(HandleLedger::default());
        let actor = SchedulerActor {
            server,
            config_rx,
            debounce,
            events,
            image_tx,
            stats: stats.clone(),
            ledger: ledger.clone(),
            target: None,
            deadline: None,
            next_id: 1,
            last_issued: None,
            displayed: None,
            inflight: JoinSet::new(),
        };
        let task = tokio::spawn(actor.run(cmd_rx));
        Self {
            control: PreviewControl {
                cmd_tx,
                image_rx,
                stats,
                ledger,
            },
            task,
        }
    }

    pub fn control(&self) -> &PreviewControl {
        &self.control
    }

    /// Stop the actor and wait for it; in-flight renders are aborted and the
    /// displayed image is released.
    pub async fn shutdown(self) {
        let _ = self.control.send(PreviewCmd::Shutdown);
        if let Err(err) = self.task.await {
            if err.is_panic() {
                warn!("preview scheduler panicked during shutdown");
            }
        }
    }
}

struct RenderDone {
    id: u64,
    target: FileEntry,
    result: Result<Vec<u8>, ClientError>,
}

struct SchedulerActor<S> {
    server: Arc<S>,
    config_rx: watch::Receiver<EditConfig>,
    debounce: Duration,
    events: Sender<SyncEvent>,
    image_tx: watch::Sender<Option<PreviewImage>>,
    stats: Arc<StatsCounters>,
    ledger: Arc<HandleLedger>,
    target: Option<FileEntry>,
    deadline: Option<Instant>,
    next_id: u64,
    last_issued: Option<u64>,
    displayed: Option<DisplayedPreview>,
    inflight: JoinSet<RenderDone>,
}

impl<S: ImageServer> SchedulerActor<S> {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<PreviewCmd>) {
        let mut config_open = true;
        loop {
            let deadline = self.deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(PreviewCmd::Schedule) => self.arm(),
                    Some(PreviewCmd::Retarget(target)) => self.retarget(target),
                    Some(PreviewCmd::Shutdown) | None => break,
                },
                changed = self.config_rx.changed(), if config_open => match changed {
                    Ok(()) => self.arm(),
                    Err(_) => config_open = false,
                },
                _ = sleep_until(deadline), if self.deadline.is_some() => {
                    self.deadline = None;
                    self.fire();
                }
                Some(joined) = self.inflight.join_next(), if !self.inflight.is_empty() => {
                    match joined {
                        Ok(done) => self.apply(done),
                        Err(err) => warn!(error = %err, "preview render task failed"),
                    }
                }
            }
        }
        self.inflight.abort_all();
        self.last_issued = None;
        if self.displayed.take().is_some() {
            self.image_tx.send_replace(None);
        }
        info!("preview scheduler stopped");
    }

    fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.debounce);
    }

    fn retarget(&mut self, target: Option<FileEntry>) {
        self.last_issued = None;
        match target {
            Some(entry) => {
                debug!(file = %entry, "preview retargeted");
                self.target = Some(entry);
                self.arm();
            }
            None => {
                self.deadline = None;
                let had_target = self.target.take().is_some();
                let previous = self.displayed.take();
                if previous.is_some() {
                    self.image_tx.send_replace(None);
                }
                if had_target || previous.is_some() {
                    let _ = self.events.send(SyncEvent::PreviewCleared);
                }
                drop(previous);
            }
        }
    }

    fn fire(&mut self) {
        let Some(target) = self.target.clone() else {
            self.stats.skipped_no_target.fetch_add(1, Ordering::Relaxed);
            debug!("preview timer fired without a target; skipping");
            return;
        };
        let config = self.config_rx.borrow().clone();
        let id = self.next_id;
        self.next_id += 1;
        self.last_issued = Some(id);
        self.stats.issued.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = id, file = %target, "issuing preview render");

        let server = self.server.clone();
        self.inflight.spawn(async move {
            let result = server.render_preview(&config).await;
            RenderDone { id, target, result }
        });
    }

    fn apply(&mut self, done: RenderDone) {
        if self.last_issued != Some(done.id) {
            self.stats.stale_discarded.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = done.id, latest = ?self.last_issued, "discarding stale preview");
            return;
        }
        match done.result {
            Ok(bytes) => {
                let image = PreviewImage {
                    request_id: done.id,
                    target: done.target,
                    bytes: Arc::from(bytes),
                };
                let handle = DisplayedPreview::new(image.clone(), self.ledger.clone());
                let previous = self.displayed.replace(handle);
                self.image_tx.send_replace(Some(image.clone()));
                self.stats.applied.fetch_add(1, Ordering::Relaxed);
                let _ = self.events.send(SyncEvent::PreviewReady { image });
                // Superseded only after the new image is in place.
                drop(previous);
            }
            Err(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(request_id = done.id, error = %err, "preview render failed");
                let _ = self.events.send(SyncEvent::PreviewFailed {
                    message: err.to_string(),
                });
            }
        }
    }
}
