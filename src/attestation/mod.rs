//! Attestation primitives.
//!
//! # Data Flow
//! ```text
//! CapturedImage (raw bytes or data URL)
//!     → hash.rs (SHA-256 content hash)
//!     → message.rs (ABI-encoded {hash, challenge, timestamp})
//!     → external signer
//!     → bundle.rs (SignatureBundle handed to upload and anchoring)
//! ```
//!
//! Everything in here is pure: no I/O, no clocks, no global state.

pub mod bundle;
pub mod hash;
pub mod image;
pub mod message;

use thiserror::Error;

pub use bundle::{SignatureBundle, SignedAttestation};
pub use hash::{hash, hash_data_url, ContentHash};
pub use image::CapturedImage;
pub use message::{build_message, AttestationMessage, Challenge, Timestamp};

/// Errors raised while validating captured input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// No image bytes were supplied.
    #[error("image data is empty")]
    Empty,

    /// The transport envelope could not be parsed.
    #[error("malformed data URL: {0}")]
    MalformedDataUrl(String),

    /// The base64 payload could not be decoded.
    #[error("invalid base64 payload: {0}")]
    Base64(String),

    /// The image source could not be read.
    #[error("cannot read image: {0}")]
    Unreadable(String),

    /// A signed bundle is missing a required field.
    #[error("signature bundle is missing {0}")]
    IncompleteBundle(&'static str),
}
