//! HTTP client for the photo storage backend.
//!
//! # Responsibilities
//! - Refuse oversized, non-image, or incompletely signed uploads locally
//! - Send exactly one multipart `POST /photos` per call, bounded by a deadline
//! - Map failure statuses onto [`RejectionKind`]
//! - List and delete stored photos

use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::timeout;

use crate::attestation::{CapturedImage, SignatureBundle};
use crate::config::UploadConfig;
use crate::observability::metrics;
use crate::upload::types::{
    ArtifactReference, ErrorBody, PhotoMetadata, RejectionKind, UploadError, UploadResponse,
};

/// Client for the storage backend's `/photos` resource.
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    list_timeout: Duration,
    max_payload_bytes: usize,
}

impl UploadClient {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let http = Client::builder()
            .build()
            .map_err(|e| UploadError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            list_timeout: Duration::from_secs(config.list_timeout_secs),
            max_payload_bytes: config.max_payload_bytes,
        })
    }

    /// Override the upload deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Local checks run before any byte leaves the process.
    pub fn check(&self, image: &CapturedImage, bundle: &SignatureBundle) -> Result<(), UploadError> {
        if !image.is_image() {
            return Err(UploadError::UnsupportedMedia(image.mime_type().to_string()));
        }
        if image.len() > self.max_payload_bytes {
            return Err(UploadError::PayloadTooLarge {
                size: image.len(),
                limit: self.max_payload_bytes,
            });
        }
        bundle.validate()?;
        Ok(())
    }

    /// Upload `image`, optionally carrying an attestation.
    ///
    /// One attempt only. On deadline the request future is dropped, which
    /// aborts the connection.
    pub async fn upload(
        &self,
        image: &CapturedImage,
        bundle: &SignatureBundle,
    ) -> Result<ArtifactReference, UploadError> {
        self.check(image, bundle)?;

        let file_name = format!("photo_{}.{}", unix_millis(), image.extension());
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(file_name.clone())
            .mime_str(image.mime_type())
            .map_err(|_| UploadError::UnsupportedMedia(image.mime_type().to_string()))?;

        let mut form = Form::new().part("photo", part);
        for (name, value) in bundle.form_fields() {
            form = form.text(name, value);
        }

        tracing::info!(
            endpoint = %self.endpoint("photos"),
            file_name = %file_name,
            size = image.len(),
            signed = bundle.is_signed(),
            "Uploading photo"
        );

        let request = self
            .http
            .post(self.endpoint("photos"))
            .header(ACCEPT, "application/json")
            .multipart(form);

        let (status, body) = self.exchange(self.timeout, request.send()).await?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        let response: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        if response.photo.file_path.is_empty() {
            return Err(UploadError::InvalidResponse("empty photo.file_path".to_string()));
        }

        tracing::info!(
            photo_id = response.photo.id,
            file_path = %response.photo.file_path,
            message = response.message.as_deref().unwrap_or_default(),
            "Upload accepted"
        );

        Ok(ArtifactReference {
            url: response.photo.file_path.clone(),
            photo: response.photo,
        })
    }

    /// `GET /photos`.
    pub async fn list_photos(&self) -> Result<Vec<PhotoMetadata>, UploadError> {
        let request = self
            .http
            .get(self.endpoint("photos"))
            .header(ACCEPT, "application/json");

        let (status, body) = self.exchange(self.list_timeout, request.send()).await?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }

    /// `DELETE /photos/{id}`.
    pub async fn delete_photo(&self, id: u64) -> Result<(), UploadError> {
        let request = self
            .http
            .delete(self.endpoint(&format!("photos/{}", id)))
            .header(ACCEPT, "application/json");

        let (status, body) = self.exchange(self.list_timeout, request.send()).await?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        tracing::info!(photo_id = id, "Photo deleted");
        Ok(())
    }

    /// Await response headers and body under one deadline.
    async fn exchange<F>(&self, deadline: Duration, send: F) -> Result<(StatusCode, String), UploadError>
    where
        F: Future<Output = reqwest::Result<reqwest::Response>>,
    {
        let exchange = async {
            let response = send.await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match timeout(deadline, exchange).await {
            Ok(Ok((status, body))) => {
                metrics::record_upload(status.as_u16());
                Ok((status, body))
            }
            Ok(Err(e)) => {
                metrics::record_upload(0);
                tracing::warn!(error = %e, "Storage request failed");
                Err(UploadError::Network(e.to_string()))
            }
            Err(_) => {
                metrics::record_upload(0);
                tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Storage request timed out");
                Err(UploadError::Timeout(deadline))
            }
        }
    }
}

fn rejection(status: StatusCode, body: &str) -> UploadError {
    let code = status.as_u16();
    let kind = RejectionKind::from_status(code);
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| kind.default_message(code));

    tracing::warn!(status = code, kind = %kind, message = %message, "Storage backend rejected request");

    UploadError::Rejected {
        kind,
        status: code,
        message,
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
