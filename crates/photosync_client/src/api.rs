//! Image server access: the [`ImageServer`] seam and its HTTP implementation.

use crate::error::ClientError;
use photosync_core::models::wire::{
    status_is_ok, BatchResponse, CheckUpdatesRequest, CheckUpdatesResponse, PathRequest,
    ProcessBatchRequest, ScanResponse, SetCurrentRequest, SetUploadTargetRequest,
    SetUploadTargetResponse, StatusResponse, UploadResponse, WatermarkUploadResponse,
};
use photosync_core::models::{
    image_mime, BatchOutcome, CapturedPhoto, DirListing, EditConfig, FolderStatus, ProcessJob,
    ScanResult,
};
use photosync_core::{Config, UPLOAD_FIELD_NAME, WATERMARK_FIELD_NAME};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How a fingerprint check identifies the folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    /// Rely on the folder the server last scanned; sends `{}`.
    ServerContext,
    /// Name the folder on every check; sends `{"path": ...}`.
    Folder(String),
}

impl PollTarget {
    fn request(&self) -> CheckUpdatesRequest {
        match self {
            Self::ServerContext => CheckUpdatesRequest::default(),
            Self::Folder(path) => CheckUpdatesRequest {
                path: Some(path.clone()),
            },
        }
    }
}

/// Operations the client needs from the image-processing server.
///
/// One method per endpoint. Implementations must be cheap to share behind an
/// `Arc`; every component holds one.
pub trait ImageServer: Send + Sync + 'static {
    /// Render the server's current file with `config` and return the encoded image.
    fn render_preview(
        &self,
        config: &EditConfig,
    ) -> impl Future<Output = Result<Vec<u8>, ClientError>> + Send;

    /// List the images in `path` and make it the server's active folder.
    fn scan_folder(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<ScanResult, ClientError>> + Send;

    fn check_updates(
        &self,
        target: &PollTarget,
    ) -> impl Future<Output = Result<FolderStatus, ClientError>> + Send;

    fn set_current(&self, filename: &str)
        -> impl Future<Output = Result<(), ClientError>> + Send;

    fn list_dirs(&self, path: &str)
        -> impl Future<Output = Result<DirListing, ClientError>> + Send;

    fn process_batch(
        &self,
        job: &ProcessJob,
    ) -> impl Future<Output = Result<BatchOutcome, ClientError>> + Send;

    /// Watermark images the server can stamp, in server order.
    fn list_watermarks(&self) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    /// Store a watermark image; returns the name the server saved it under.
    fn upload_watermark(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Choose the server that photobooth uploads are forwarded to. Uploads
    /// are refused until one is set.
    fn set_upload_target(
        &self,
        target: &str,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Upload captured photos; returns how many the server stored.
    fn upload_photos(
        &self,
        photos: &[CapturedPhoto],
    ) -> impl Future<Output = Result<u32, ClientError>> + Send;
}

/// Build an endpoint URL by appending percent-encoded path segments to `server`.
///
/// # Errors
/// Returns [`ClientError::InvalidUrl`] when `server` is not an absolute base URL.
pub fn api_url(server: &str, segments: &[&str]) -> Result<reqwest::Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: server.to_string(),
        reason,
    };
    let mut url = reqwest::Url::parse(server).map_err(|err| invalid(err.to_string()))?;
    let mut path = url
        .path_segments_mut()
        .map_err(|_| invalid("cannot be used as an API base".to_string()))?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    drop(path);
    Ok(url)
}

/// Pick the most useful message out of a failed response body.
///
/// Prefers a JSON `error` (or `msg`) field, then the raw body, then the HTTP
/// reason phrase.
pub fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value
            .get("error")
            .or_else(|| value.get("msg"))
            .and_then(|v| v.as_str())
            .unwrap_or(body)
            .to_string();
    }

    body.to_string()
}

async fn ensure_success(
    res: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    Err(ClientError::Server {
        action: action.to_string(),
        status: status.as_u16(),
        message: error_message_for_response(status, &body),
    })
}

fn ensure_status_ok(
    action: &str,
    status: Option<&str>,
    message: Option<String>,
) -> Result<(), ClientError> {
    if status_is_ok(status) {
        return Ok(());
    }
    let message = message
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| format!("server reported status '{}'", status.unwrap_or_default()));
    Err(ClientError::rejected(action, message))
}

/// [`ImageServer`] over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpImageServer {
    client: reqwest::Client,
    server: String,
}

impl HttpImageServer {
    /// Create a client for `server` with a per-request `timeout`.
    ///
    /// # Errors
    /// Returns an error when the base URL is unusable or the HTTP client
    /// cannot be built.
    pub fn new(server: &str, timeout: Duration) -> Result<Self, ClientError> {
        api_url(server, &[])?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            server: server.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(&config.server_url, config.request_timeout())
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    async fn post_json<B, R>(
        &self,
        action: &str,
        segments: &[&str],
        body: &B,
    ) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = api_url(&self.server, segments)?;
        debug!(action, url = %url, "POST");
        let res = self.client.post(url).json(body).send().await?;
        let res = ensure_success(res, action).await?;
        let text = res.text().await?;
        decode(action, &text)
    }

    async fn post_multipart<R: DeserializeOwned>(
        &self,
        action: &str,
        segments: &[&str],
        form: Form,
    ) -> Result<R, ClientError> {
        let url = api_url(&self.server, segments)?;
        debug!(action, url = %url, "POST multipart");
        let res = self.client.post(url).multipart(form).send().await?;
        let res = ensure_success(res, action).await?;
        let text = res.text().await?;
        decode(action, &text)
    }
}

fn decode<R: DeserializeOwned>(action: &str, text: &str) -> Result<R, ClientError> {
    serde_json::from_str(text).map_err(|err| ClientError::Decode {
        action: action.to_string(),
        message: err.to_string(),
    })
}

impl ImageServer for HttpImageServer {
    async fn render_preview(&self, config: &EditConfig) -> Result<Vec<u8>, ClientError> {
        let url = api_url(&self.server, &["preview-live"])?;
        let res = self.client.post(url).json(config).send().await?;
        let res = ensure_success(res, "Preview").await?;
        Ok(res.bytes().await?.to_vec())
    }

    async fn scan_folder(&self, path: &str) -> Result<ScanResult, ClientError> {
        let body = PathRequest {
            path: path.to_string(),
        };
        let response: ScanResponse = self
            .post_json("Scan", &["api", "scan-images"], &body)
            .await?;
        ensure_status_ok("Scan", response.status.as_deref(), response.msg.clone())?;
        Ok(response.into_scan_result())
    }

    async fn check_updates(&self, target: &PollTarget) -> Result<FolderStatus, ClientError> {
        let response: CheckUpdatesResponse = self
            .post_json("Check", &["api", "check-updates"], &target.request())
            .await?;
        ensure_status_ok("Check", response.status.as_deref(), response.msg.clone())?;
        Ok(FolderStatus::from(response))
    }

    async fn set_current(&self, filename: &str) -> Result<(), ClientError> {
        let body = SetCurrentRequest {
            filename: filename.to_string(),
        };
        let response: StatusResponse = self
            .post_json("Select", &["api", "set-current"], &body)
            .await?;
        ensure_status_ok("Select", response.status.as_deref(), response.msg)
    }

    async fn list_dirs(&self, path: &str) -> Result<DirListing, ClientError> {
        let body = PathRequest {
            path: path.to_string(),
        };
        self.post_json("List dirs", &["api", "list-dirs"], &body)
            .await
    }

    async fn process_batch(&self, job: &ProcessJob) -> Result<BatchOutcome, ClientError> {
        let body = ProcessBatchRequest::from(job);
        let response: BatchResponse = self
            .post_json("Batch", &["process-batch"], &body)
            .await?;
        ensure_status_ok("Batch", response.status.as_deref(), response.msg.clone())?;
        Ok(response.outcome())
    }

    async fn list_watermarks(&self) -> Result<Vec<String>, ClientError> {
        let url = api_url(&self.server, &["api", "wm-list"])?;
        debug!(url = %url, "GET");
        let res = self.client.get(url).send().await?;
        let res = ensure_success(res, "Watermarks").await?;
        let text = res.text().await?;
        decode("Watermarks", &text)
    }

    async fn upload_watermark(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(image_mime(filename))?;
        let form = Form::new().part(WATERMARK_FIELD_NAME, part);
        let response: WatermarkUploadResponse = self
            .post_multipart("Watermark upload", &["api", "wm-upload"], form)
            .await?;
        ensure_status_ok(
            "Watermark upload",
            Some(response.status.as_deref().unwrap_or("error")),
            response.error,
        )?;
        Ok(response
            .filename
            .unwrap_or_else(|| filename.to_string()))
    }

    async fn set_upload_target(&self, target: &str) -> Result<String, ClientError> {
        let body = SetUploadTargetRequest {
            ip: target.to_string(),
        };
        let response: SetUploadTargetResponse = self
            .post_json("Set target", &["api", "set_server"], &body)
            .await?;
        ensure_status_ok("Set target", response.status.as_deref(), response.error)?;
        Ok(response.target.unwrap_or_else(|| target.to_string()))
    }

    async fn upload_photos(&self, photos: &[CapturedPhoto]) -> Result<u32, ClientError> {
        let mut form = Form::new();
        for photo in photos {
            let part = Part::bytes(photo.bytes.clone())
                .file_name(photo.file_name.clone())
                .mime_str(image_mime(&photo.file_name))?;
            form = form.part(UPLOAD_FIELD_NAME, part);
        }
        let response: UploadResponse = self
            .post_multipart("Upload", &["api", "upload"], form)
            .await?;
        ensure_status_ok("Upload", response.status.as_deref(), response.error)?;
        Ok(response.count)
    }
}
