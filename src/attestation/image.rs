//! Captured image payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::path::Path;

use crate::attestation::InputError;

/// MIME type assumed when a capture carries none.
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Raw encoded image bytes plus their MIME type.
///
/// Owned by the pipeline for the duration of one attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    bytes: Vec<u8>,
    mime_type: String,
}

impl CapturedImage {
    /// Wrap raw encoded bytes.
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Result<Self, InputError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }

        let mime_type = mime_type.into();
        let mime_type = if mime_type.trim().is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime_type.trim().to_ascii_lowercase()
        };

        Ok(Self { bytes, mime_type })
    }

    /// Decode a `data:<mime>;base64,<payload>` URL, as produced by browser
    /// camera screenshots.
    pub fn from_data_url(data_url: &str) -> Result<Self, InputError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| InputError::MalformedDataUrl("missing `data:` scheme".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| InputError::MalformedDataUrl("missing `,` separator".to_string()))?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default();
        if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(InputError::MalformedDataUrl(
                "only base64 payloads are supported".to_string(),
            ));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| InputError::Base64(e.to_string()))?;

        Self::new(bytes, mime_type)
    }

    /// Read an image from disk, inferring the MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let bytes = std::fs::read(path)
            .map_err(|e| InputError::Unreadable(format!("{}: {}", path.display(), e)))?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(mime_for_extension)
            .unwrap_or(DEFAULT_MIME_TYPE);
        Self::new(bytes, mime_type)
    }

    /// Raw encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type, lowercased.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the encoded payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; empty captures are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the MIME type names an image.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// File extension derived from the MIME subtype (`image/png` → `png`).
    pub fn extension(&self) -> &str {
        match self.mime_type.split_once('/') {
            Some((_, "jpeg")) => "jpeg",
            Some((_, subtype)) => subtype.split(['+', ';']).next().unwrap_or("bin"),
            None => "bin",
        }
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
