//! Periodic fingerprint checks for the active folder.

use crate::api::{ImageServer, PollTarget};
use crate::error::ClientError;
use crate::gallery::Gallery;
use crate::protocol::SyncEvent;
use crossbeam_channel::Sender;
use photosync_core::models::{FolderFingerprint, FolderStatus};
use photosync_core::ReconcileCause;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Whether a check result means the folder changed since `last_seen`.
///
/// A reported fingerprint is authoritative; the server's own `changed` flag
/// is only consulted when it sends none. With nothing seen yet, any
/// fingerprint counts as a change.
pub fn detect_change(last_seen: Option<&FolderFingerprint>, status: &FolderStatus) -> bool {
    match &status.fingerprint {
        Some(reported) => last_seen != Some(reported),
        None => status.changed,
    }
}

/// Counters for one poller's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollStats {
    pub ticks: u64,
    pub changes: u64,
    pub failures: u64,
}

#[derive(Default)]
struct PollShared {
    last_seen: Mutex<Option<FolderFingerprint>>,
    ticks: AtomicU64,
    changes: AtomicU64,
    failures: AtomicU64,
}

impl PollShared {
    fn last_seen(&self) -> Option<FolderFingerprint> {
        match self.last_seen.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_last_seen(&self, fingerprint: Option<FolderFingerprint>) {
        match self.last_seen.lock() {
            Ok(mut slot) => *slot = fingerprint,
            Err(poisoned) => *poisoned.into_inner() = fingerprint,
        }
    }
}

/// Owns at most one polling loop at a time.
pub struct FolderPoller<S> {
    server: Arc<S>,
    gallery: Arc<Gallery<S>>,
    events: Sender<SyncEvent>,
    period: Duration,
    shared: Arc<PollShared>,
    task: Option<JoinHandle<()>>,
    target: Option<PollTarget>,
}

impl<S: ImageServer> FolderPoller<S> {
    pub fn new(
        server: Arc<S>,
        gallery: Arc<Gallery<S>>,
        events: Sender<SyncEvent>,
        period: Duration,
    ) -> Self {
        Self {
            server,
            gallery,
            events,
            period,
            shared: Arc::new(PollShared::default()),
            task: None,
            target: None,
        }
    }

    /// Start checking `target` every period, replacing any running loop.
    ///
    /// The first check happens one full period after the call.
    pub fn start_monitoring(&mut self, target: PollTarget) {
        self.stop_monitoring();
        self.shared.set_last_seen(None);
        info!(poll_target = ?target, period_ms = self.period.as_millis() as u64, "monitoring started");

        let server = self.server.clone();
        let gallery = self.gallery.clone();
        let events = self.events.clone();
        let shared = self.shared.clone();
        let period = self.period;
        let loop_target = target.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                run_tick(&*server, &gallery, &events, &shared, &loop_target).await;
            }
        }));
        self.target = Some(target);
    }

    pub fn stop_monitoring(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("monitoring stopped");
        }
        self.target = None;
    }

    pub fn is_monitoring(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn target(&self) -> Option<&PollTarget> {
        self.target.as_ref()
    }

    pub fn last_seen(&self) -> Option<FolderFingerprint> {
        self.shared.last_seen()
    }

    pub fn stats(&self) -> PollStats {
        PollStats {
            ticks: self.shared.ticks.load(Ordering::Relaxed),
            changes: self.shared.changes.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
        }
    }
}

impl<S> Drop for FolderPoller<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_tick<S: ImageServer>(
    server: &S,
    gallery: &Gallery<S>,
    events: &Sender<SyncEvent>,
    shared: &PollShared,
    target: &PollTarget,
) {
    shared.ticks.fetch_add(1, Ordering::Relaxed);
    match poll_once(server, gallery, shared, target).await {
        Ok(true) => {
            shared.changes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(false) => {}
        Err(err) => {
            shared.failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "folder check failed");
            let _ = events.send(SyncEvent::PollFailed {
                message: err.to_string(),
            });
        }
    }
}

/// One fingerprint check, with a rescan when the folder changed.
///
/// The new fingerprint is only recorded once the merge succeeded, so a
/// failed rescan is retried on the next tick.
async fn poll_once<S: ImageServer>(
    server: &S,
    gallery: &Gallery<S>,
    shared: &PollShared,
    target: &PollTarget,
) -> Result<bool, ClientError> {
    let mut status = server.check_updates(target).await?;
    let last_seen = shared.last_seen();
    if !detect_change(last_seen.as_ref(), &status) {
        debug!("folder unchanged");
        return Ok(false);
    }
    debug!(
        previous = ?last_seen.as_ref().map(FolderFingerprint::as_str),
        reported = ?status.fingerprint.as_ref().map(FolderFingerprint::as_str),
        "folder changed"
    );

    match status.snapshot.take() {
        Some(snapshot) => gallery.merge(snapshot, ReconcileCause::FolderChanged).await?,
        None => gallery.rescan(ReconcileCause::FolderChanged).await?,
    };
    if status.fingerprint.is_some() {
        shared.set_last_seen(status.fingerprint);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewScheduler;
    use crate::test_support::{drain, FakeServer};
    use photosync_core::models::{EditConfig, EditControls, FileEntry};
    use tokio::sync::watch;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_millis(2_000);

    struct Harness {
        server: FakeServer,
        gallery: Arc<Gallery<FakeServer>>,
        poller: FolderPoller<FakeServer>,
        scheduler: PreviewScheduler,
        events: crossbeam_channel::Receiver<SyncEvent>,
        _config_tx: watch::Sender<EditConfig>,
    }

    async fn opened(server: FakeServer) -> Harness {
        let shared = Arc::new(server.clone());
        let (config_tx, config_rx) = watch::channel(EditControls::default().build_config());
        let (evt_tx, events) = crossbeam_channel::unbounded();
        let scheduler = PreviewScheduler::spawn(
            shared.clone(),
            config_rx,
            Duration::from_millis(100),
            evt_tx.clone(),
        );
        let gallery = Arc::new(Gallery::new(
            shared.clone(),
            scheduler.control().clone(),
            evt_tx.clone(),
        ));
        gallery.open("/shots").await.expect("open");
        let poller = FolderPoller::new(shared, gallery.clone(), evt_tx, PERIOD);
        Harness {
            server,
            gallery,
            poller,
            scheduler,
            events,
            _config_tx: config_tx,
        }
    }

    fn status(fingerprint: Option<&str>, changed: bool) -> FolderStatus {
        FolderStatus {
            fingerprint: fingerprint.map(FolderFingerprint::new),
            changed,
            snapshot: None,
        }
    }

    #[test]
    fn detect_change_matrix() {
        let seen = FolderFingerprint::new("h1");
        let cases = [
            (None, status(Some("h1"), false), true),
            (Some(&seen), status(Some("h1"), false), false),
            (Some(&seen), status(Some("h1"), true), false),
            (Some(&seen), status(Some("h2"), false), true),
            (Some(&seen), status(None, true), true),
            (Some(&seen), status(None, false), false),
        ];
        for (last_seen, status, expected) in cases {
            assert_eq!(detect_change(last_seen, &status), expected, "{:?}", status);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_fingerprint_does_not_rescan_or_render() {
        let mut h = opened(FakeServer::with_files(&["a.jpg", "b.jpg"], "h1")).await;
        h.poller.start_monitoring(PollTarget::ServerContext);
        sleep(Duration::from_millis(2_500)).await;
        let scans_after_first = h.server.scan_count();
        let renders_after_first = h.server.render_count();

        sleep(PERIOD * 2).await;
        assert_eq!(h.poller.stats().ticks, 3);
        assert_eq!(h.server.scan_count(), scans_after_first);
        assert_eq!(h.server.render_count(), renders_after_first);
        assert_eq!(h.poller.last_seen(), Some(FolderFingerprint::new("h1")));
    }

    #[tokio::test(start_paused = true)]
    async fn new_file_is_picked_up_on_next_tick() {
        let mut h = opened(FakeServer::with_files(&["a.jpg"], "h1")).await;
        h.poller.start_monitoring(PollTarget::ServerContext);
        sleep(Duration::from_millis(2_500)).await;

        h.server.set_files(&["a.jpg", "b.jpg"], None);
        h.server.set_fingerprint("h2");
        sleep(PERIOD).await;

        let state = h.gallery.snapshot();
        assert_eq!(state.len(), 2);
        assert_eq!(state.current().map(FileEntry::name), Some("a.jpg"));
        assert_eq!(h.poller.last_seen(), Some(FolderFingerprint::new("h2")));
        assert!(h.poller.stats().changes >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn piggybacked_listing_skips_rescan() {
        let server = FakeServer::with_files(&["a.jpg"], "h1");
        server.piggyback_files(true);
        let mut h = opened(server).await;
        let scans = h.server.scan_count();
        h.poller.start_monitoring(PollTarget::ServerContext);

        h.server.set_files(&["a.jpg", "c.jpg"], Some("c.jpg"));
        h.server.set_fingerprint("h2");
        sleep(Duration::from_millis(2_500)).await;

        assert_eq!(h.server.scan_count(), scans);
        assert_eq!(
            h.gallery.snapshot().current().map(FileEntry::name),
            Some("c.jpg")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_check_emits_event_and_keeps_polling() {
        let mut h = opened(FakeServer::with_files(&["a.jpg"], "h1")).await;
        h.server.fail_next_checks(1);
        h.poller.start_monitoring(PollTarget::ServerContext);
        sleep(Duration::from_millis(4_500)).await;

        let stats = h.poller.stats();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.failures, 1);
        assert!(h.poller.is_monitoring());
        assert_eq!(h.poller.last_seen(), Some(FolderFingerprint::new("h1")));
        assert!(drain(&h.events).iter().any(|event| matches!(
            event,
            SyncEvent::PollFailed { message } if message.contains("connection reset")
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_rescan_retries_on_next_tick() {
        let mut h = opened(FakeServer::with_files(&["a.jpg"], "h1")).await;
        h.poller.start_monitoring(PollTarget::ServerContext);
        h.server.set_files(&["a.jpg", "b.jpg"], None);
        h.server.set_fingerprint("h2");
        h.server.fail_next_scans(1);
        sleep(Duration::from_millis(2_500)).await;
        assert_eq!(h.poller.last_seen(), None);
        assert_eq!(h.gallery.snapshot().len(), 1);

        sleep(PERIOD).await;
        assert_eq!(h.poller.last_seen(), Some(FolderFingerprint::new("h2")));
        assert_eq!(h.gallery.snapshot().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_loop_and_stop_halts_checks() {
        let mut h = opened(FakeServer::with_files(&["a.jpg"], "h1")).await;
        h.poller.start_monitoring(PollTarget::ServerContext);
        h.poller
            .start_monitoring(PollTarget::Folder("/shots".to_string()));
        sleep(Duration::from_millis(2_500)).await;

        let checks = h.server.checks();
        assert_eq!(checks, vec![PollTarget::Folder("/shots".to_string())]);

        h.poller.stop_monitoring();
        assert!(!h.poller.is_monitoring());
        sleep(PERIOD * 3).await;
        assert_eq!(h.server.checks().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_current_during_poll_clears_preview() {
        let mut h = opened(FakeServer::with_files(&["a.jpg", "b.jpg"], "h1")).await;
        h.poller.start_monitoring(PollTarget::ServerContext);
        sleep(Duration::from_millis(2_500)).await;
        assert!(h.scheduler.control().current_image().is_some());

        h.server.set_files(&["a.jpg"], None);
        h.server.set_fingerprint("h2");
        sleep(PERIOD).await;

        assert_eq!(h.gallery.snapshot().current(), None);
        assert!(h.scheduler.control().current_image().is_none());
    }
}
