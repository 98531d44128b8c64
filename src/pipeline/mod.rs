//! Attestation pipeline.
//!
//! # Data Flow
//! ```text
//! capture(CapturedImage)
//!     → Hashing            (local checks, content hash)
//!     → AwaitingSignature  (challenge, message, signature)
//!     → Uploading          (image + signature bundle → ArtifactReference)
//!     → Anchoring          (submit, then confirm → AttestationReceipt)
//!     → Complete
//! ```
//!
//! Failure at any stage ends the attempt in `Errored`; later stages never
//! run. Nothing is retried automatically.

pub mod challenge;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use challenge::{ChallengeError, ChallengeSource, StaticChallenge};
pub use error::{AttestError, AttestResult, PipelineError, StageError};
pub use orchestrator::AttestationPipeline;
pub use state::{AnchorPhase, AttestationOutcome, PipelineState, Stage};
