//! Photo attestation library.
//!
//! Turns a captured image into a content hash, a signed attestation, a stored
//! artifact and a ledger anchor, one attempt at a time.

pub mod anchor;
pub mod attestation;
pub mod blockchain;
pub mod config;
pub mod identity;
pub mod observability;
pub mod pipeline;
pub mod upload;

pub use attestation::{CapturedImage, ContentHash, SignatureBundle};
pub use config::AttestConfig;
pub use pipeline::{AttestationPipeline, PipelineState};
