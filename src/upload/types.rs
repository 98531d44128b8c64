//! Storage backend wire types and error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::attestation::InputError;

/// Photo record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub id: u64,
    #[serde(default)]
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Stable locator of an uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Storage path returned by the backend; what gets anchored.
    pub url: String,
    /// Full record the backend returned.
    pub photo: PhotoMetadata,
}

impl ArtifactReference {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Successful `POST /photos` body.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub photo: PhotoMetadata,
}

/// Non-2xx body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Server-side rejection causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// 400: malformed request or image.
    Validation,
    /// 401 / 403.
    Auth,
    /// 404: endpoint missing, usually misconfigured base URL.
    NotFound,
    /// 413.
    Size,
    /// 415.
    UnsupportedMedia,
    /// 500.
    Server,
    /// 503.
    Unavailable,
    /// Anything else.
    Unknown,
}

impl RejectionKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => RejectionKind::Validation,
            401 | 403 => RejectionKind::Auth,
            404 => RejectionKind::NotFound,
            413 => RejectionKind::Size,
            415 => RejectionKind::UnsupportedMedia,
            500 => RejectionKind::Server,
            503 => RejectionKind::Unavailable,
            _ => RejectionKind::Unknown,
        }
    }

    /// Message shown when the server body carries none.
    pub fn default_message(&self, status: u16) -> String {
        match self {
            RejectionKind::Validation => {
                "Invalid request. Please check the image data.".to_string()
            }
            RejectionKind::Auth if status == 403 => "Access denied.".to_string(),
            RejectionKind::Auth => "Authentication failed. Please sign in again.".to_string(),
            RejectionKind::NotFound => {
                "API endpoint not found. Please check the server configuration.".to_string()
            }
            RejectionKind::Size => {
                "Image is too large. Please use a smaller image.".to_string()
            }
            RejectionKind::UnsupportedMedia => "Unsupported image format.".to_string(),
            RejectionKind::Server => {
                "Server error. Please wait a moment and try again.".to_string()
            }
            RejectionKind::Unavailable => {
                "Service temporarily unavailable. Please wait a moment and try again.".to_string()
            }
            RejectionKind::Unknown => format!(
                "Upload failed ({}). Please wait a moment and try again.",
                status
            ),
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectionKind::Validation => "validation",
            RejectionKind::Auth => "auth",
            RejectionKind::NotFound => "not_found",
            RejectionKind::Size => "size",
            RejectionKind::UnsupportedMedia => "unsupported_media",
            RejectionKind::Server => "server",
            RejectionKind::Unavailable => "unavailable",
            RejectionKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Errors raised by the storage client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The image or bundle failed local checks; nothing was sent.
    #[error("{0}")]
    InvalidInput(#[from] InputError),

    /// Only `image/*` payloads are accepted; nothing was sent.
    #[error("only image files can be uploaded (got {0})")]
    UnsupportedMedia(String),

    /// The payload exceeds the configured limit; nothing was sent.
    #[error("image is too large ({size} bytes, limit {limit} bytes)")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The deadline passed and the in-flight request was dropped.
    #[error("request timed out after {}s; check the network and try again", .0.as_secs_f64())]
    Timeout(Duration),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Rejected {
        kind: RejectionKind,
        status: u16,
        message: String,
    },

    /// The request never completed (DNS, connect, reset).
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx answer that could not be understood.
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),
}

impl UploadError {
    /// True when the request was refused before touching the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            UploadError::InvalidInput(_)
                | UploadError::UnsupportedMedia(_)
                | UploadError::PayloadTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_taxonomy() {
        assert_eq!(RejectionKind::from_status(400), RejectionKind::Validation);
        assert_eq!(RejectionKind::from_status(401), RejectionKind::Auth);
        assert_eq!(RejectionKind::from_status(403), RejectionKind::Auth);
        assert_eq!(RejectionKind::from_status(404), RejectionKind::NotFound);
        assert_eq!(RejectionKind::from_status(413), RejectionKind::Size);
        assert_eq!(RejectionKind::from_status(415), RejectionKind::UnsupportedMedia);
        assert_eq!(RejectionKind::from_status(500), RejectionKind::Server);
        assert_eq!(RejectionKind::from_status(503), RejectionKind::Unavailable);
        assert_eq!(RejectionKind::from_status(502), RejectionKind::Unknown);
        assert_eq!(RejectionKind::from_status(418), RejectionKind::Unknown);
    }

    #[test]
    fn test_default_messages() {
        assert_eq!(RejectionKind::Auth.default_message(403), "Access denied.");
        assert!(RejectionKind::Unknown.default_message(418).contains("418"));
    }

    #[test]
    fn test_upload_response_tolerates_sparse_photo() {
        let body = r#"{"message":"ok","photo":{"id":7,"file_path":"photos/photo_1.jpeg"}}"#;
        let response: UploadResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.photo.id, 7);
        assert_eq!(response.photo.file_path, "photos/photo_1.jpeg");
        assert_eq!(response.message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_local_errors() {
        assert!(UploadError::PayloadTooLarge { size: 2, limit: 1 }.is_local());
        assert!(!UploadError::Timeout(Duration::from_secs(30)).is_local());
    }
}
