//! Shared test-only helpers for photosync_client.

use crate::api::{ImageServer, PollTarget};
use crate::error::ClientError;
use crate::protocol::SyncEvent;
use crossbeam_channel::Receiver;
use photosync_core::models::{
    BatchOutcome, CapturedPhoto, DirListing, EditConfig, FolderFingerprint, FolderStatus,
    ProcessJob, ScanResult,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

struct RenderStep {
    delay: Duration,
    result: Result<Vec<u8>, String>,
}

#[derive(Default)]
struct FakeState {
    files: Vec<String>,
    current_hint: Option<String>,
    fingerprint: Option<String>,
    piggyback_files: bool,
    resets_current_on_scan: bool,
    server_current: Option<String>,
    render_plan: VecDeque<RenderStep>,
    failing_checks: usize,
    failing_scans: usize,
    batch_result: Option<Result<BatchOutcome, String>>,
    upload_error: Option<String>,
    watermarks: Vec<String>,
    upload_target: Option<String>,
    renders: Vec<EditConfig>,
    scans: Vec<String>,
    checks: Vec<PollTarget>,
    selections: Vec<String>,
    batches: Vec<ProcessJob>,
    uploads: Vec<Vec<String>>,
}

fn server_error(action: &str, message: &str) -> ClientError {
    ClientError::Server {
        action: action.to_string(),
        status: 500,
        message: message.to_string(),
    }
}

/// In-memory [`ImageServer`] with scripted responses and a call log.
///
/// Clones share state so a test can keep one copy while the session owns another.
#[derive(Clone, Default)]
pub(crate) struct FakeServer {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeServer {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().expect("fake server state")
    }

    pub(crate) fn with_files(files: &[&str], fingerprint: &str) -> Self {
        let server = Self::default();
        server.set_files(files, None);
        server.set_fingerprint(fingerprint);
        server
    }

    pub(crate) fn set_files(&self, files: &[&str], current_hint: Option<&str>) {
        let mut state = self.state();
        state.files = files.iter().map(|name| name.to_string()).collect();
        state.current_hint = current_hint.map(str::to_string);
    }

    pub(crate) fn set_fingerprint(&self, fingerprint: &str) {
        self.state().fingerprint = Some(fingerprint.to_string());
    }

    /// Include the listing in check responses, sparing the rescan.
    pub(crate) fn piggyback_files(&self, enabled: bool) {
        self.state().piggyback_files = enabled;
    }

    /// Behave like the real server: every scan silently makes the first file
    /// current, and renders return the name of the server's current file.
    pub(crate) fn reset_current_on_scan(&self) {
        self.state().resets_current_on_scan = true;
    }

    pub(crate) fn server_current(&self) -> Option<String> {
        self.state().server_current.clone()
    }

    pub(crate) fn queue_render(&self, delay: Duration, result: Result<Vec<u8>, String>) {
        self.state()
            .render_plan
            .push_back(RenderStep { delay, result });
    }

    pub(crate) fn fail_next_checks(&self, count: usize) {
        self.state().failing_checks = count;
    }

    pub(crate) fn fail_next_scans(&self, count: usize) {
        self.state().failing_scans = count;
    }

    pub(crate) fn set_batch_result(&self, result: Result<BatchOutcome, String>) {
        self.state().batch_result = Some(result);
    }

    pub(crate) fn fail_uploads(&self, message: &str) {
        self.state().upload_error = Some(message.to_string());
    }

    pub(crate) fn set_watermarks(&self, names: &[&str]) {
        self.state().watermarks = names.iter().map(|name| name.to_string()).collect();
    }

    pub(crate) fn watermarks(&self) -> Vec<String> {
        self.state().watermarks.clone()
    }

    pub(crate) fn upload_target(&self) -> Option<String> {
        self.state().upload_target.clone()
    }

    pub(crate) fn renders(&self) -> Vec<EditConfig> {
        self.state().renders.clone()
    }

    pub(crate) fn render_count(&self) -> usize {
        self.state().renders.len()
    }

    pub(crate) fn scan_count(&self) -> usize {
        self.state().scans.len()
    }

    pub(crate) fn checks(&self) -> Vec<PollTarget> {
        self.state().checks.clone()
    }

    pub(crate) fn selections(&self) -> Vec<String> {
        self.state().selections.clone()
    }

    pub(crate) fn batches(&self) -> Vec<ProcessJob> {
        self.state().batches.clone()
    }

    pub(crate) fn uploads(&self) -> Vec<Vec<String>> {
        self.state().uploads.clone()
    }
}

impl ImageServer for FakeServer {
    async fn render_preview(&self, config: &EditConfig) -> Result<Vec<u8>, ClientError> {
        let step = {
            let mut state = self.state();
            state.renders.push(config.clone());
            let count = state.renders.len();
            let default = if state.resets_current_on_scan {
                state
                    .server_current
                    .clone()
                    .map(String::into_bytes)
                    .ok_or_else(|| "No Image".to_string())
            } else {
                Ok(format!("render-{}", count).into_bytes())
            };
            state.render_plan.pop_front().unwrap_or(RenderStep {
                delay: Duration::ZERO,
                result: default,
            })
        };
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
            .map_err(|message| server_error("Preview", &message))
    }

    async fn scan_folder(&self, path: &str) -> Result<ScanResult, ClientError> {
        let mut state = self.state();
        state.scans.push(path.to_string());
        if state.failing_scans > 0 {
            state.failing_scans -= 1;
            return Err(server_error("Scan", "scan unavailable"));
        }
        if state.resets_current_on_scan {
            state.server_current = state.files.first().cloned();
            return Ok(ScanResult::new(state.files.clone(), None));
        }
        Ok(ScanResult::new(
            state.files.clone(),
            state.current_hint.as_deref(),
        ))
    }

    async fn check_updates(&self, target: &PollTarget) -> Result<FolderStatus, ClientError> {
        let mut state = self.state();
        state.checks.push(target.clone());
        if state.failing_checks > 0 {
            state.failing_checks -= 1;
            return Err(server_error("Check", "connection reset"));
        }
        let snapshot = state
            .piggyback_files
            .then(|| ScanResult::new(state.files.clone(), state.current_hint.as_deref()));
        Ok(FolderStatus {
            fingerprint: state.fingerprint.clone().map(FolderFingerprint::new),
            changed: false,
            snapshot,
        })
    }

    async fn set_current(&self, filename: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        state.selections.push(filename.to_string());
        state.current_hint = Some(filename.to_string());
        state.server_current = Some(filename.to_string());
        Ok(())
    }

    async fn list_dirs(&self, path: &str) -> Result<DirListing, ClientError> {
        Ok(DirListing {
            parent: path.to_string(),
            items: vec!["shots".to_string()],
            current: Some(path.to_string()),
        })
    }

    async fn process_batch(&self, job: &ProcessJob) -> Result<BatchOutcome, ClientError> {
        let mut state = self.state();
        state.batches.push(job.clone());
        match state.batch_result.clone() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(server_error("Batch", &message)),
            None => Ok(BatchOutcome {
                processed: state.files.len() as u32,
                errors: 0,
            }),
        }
    }

    async fn list_watermarks(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.state().watermarks.clone())
    }

    async fn upload_watermark(&self, filename: &str, _bytes: Vec<u8>) -> Result<String, ClientError> {
        let mut state = self.state();
        if !state.watermarks.iter().any(|name| name == filename) {
            state.watermarks.push(filename.to_string());
            state.watermarks.sort();
        }
        Ok(filename.to_string())
    }

    async fn set_upload_target(&self, target: &str) -> Result<String, ClientError> {
        self.state().upload_target = Some(target.to_string());
        Ok(target.to_string())
    }

    async fn upload_photos(&self, photos: &[CapturedPhoto]) -> Result<u32, ClientError> {
        let mut state = self.state();
        if state.upload_target.is_none() {
            return Err(ClientError::Server {
                action: "Upload".to_string(),
                status: 400,
                message: "no target server selected".to_string(),
            });
        }
        state
            .uploads
            .push(photos.iter().map(|photo| photo.file_name.clone()).collect());
        match state.upload_error.clone() {
            Some(message) => Err(server_error("Upload", &message)),
            None => Ok(photos.len() as u32),
        }
    }
}

/// Collect every event currently queued.
pub(crate) fn drain(rx: &Receiver<SyncEvent>) -> Vec<SyncEvent> {
    rx.try_iter().collect()
}
