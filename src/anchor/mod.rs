//! Ledger anchoring.
//!
//! # Data Flow
//! ```text
//! ArtifactReference + ContentHash + Timestamp + Signature
//!     → contract.rs (anchorPhoto call data)
//!     → IdentityProvider::submit_transaction   (phase one: submit)
//!     → ConfirmationSource::await_confirmation (phase two: confirm)
//!     → AttestationReceipt
//! ```

pub mod client;
pub mod contract;

pub use client::{AnchorError, AttestationReceipt, LedgerAnchorClient, PendingAnchor};
pub use contract::anchor_calldata;
