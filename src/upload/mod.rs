//! Artifact storage subsystem.
//!
//! # Data Flow
//! ```text
//! CapturedImage + SignatureBundle
//!     → client.rs (local checks, multipart POST /photos under a deadline)
//!     → types.rs (status → RejectionKind, photo.file_path → ArtifactReference)
//! ```
//!
//! # Design Decisions
//! - Exactly one attempt per call; retrying is the caller's decision
//! - Size, media type and bundle completeness are checked before sending
//! - A timeout is distinct from any server-side rejection

pub mod client;
pub mod types;

pub use client::UploadClient;
pub use types::{ArtifactReference, PhotoMetadata, RejectionKind, UploadError};
