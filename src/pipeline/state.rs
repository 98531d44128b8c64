//! Pipeline state machine.
//!
//! # States
//! - Idle: no attempt running
//! - Hashing → AwaitingSignature → Uploading → Anchoring: one attempt in flight
//! - Complete: receipt and artifact available
//! - Errored: the stage that failed, why, and any artifact already stored
//!
//! # State Transitions
//! ```text
//! Idle | Complete | Errored → Hashing: attest()
//! Hashing → AwaitingSignature → Uploading → Anchoring(Submitting)
//!     → Anchoring(Confirming) → Complete
//! any in-flight state → Errored
//! any state → Idle: reset() / retake()
//! ```

use alloy::primitives::TxHash;
use serde::Serialize;
use std::fmt;

use crate::anchor::AttestationReceipt;
use crate::attestation::SignedAttestation;
use crate::pipeline::error::StageError;
use crate::upload::ArtifactReference;

/// Pipeline stages that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Hashing,
    AwaitingSignature,
    Uploading,
    Anchoring,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Hashing => "hashing",
            Stage::AwaitingSignature => "awaiting_signature",
            Stage::Uploading => "uploading",
            Stage::Anchoring => "anchoring",
        }
    }

    /// Human label used in fallback error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Hashing => "hashing the image",
            Stage::AwaitingSignature => "signing",
            Stage::Uploading => "uploading",
            Stage::Anchoring => "recording on the ledger",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-phase of anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AnchorPhase {
    Submitting,
    Confirming { tx_hash: TxHash },
}

/// Result of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttestationOutcome {
    pub receipt: AttestationReceipt,
    pub artifact: ArtifactReference,
    pub attestation: SignedAttestation,
}

/// Observable pipeline state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Hashing,
    AwaitingSignature,
    Uploading,
    Anchoring(AnchorPhase),
    Complete(Box<AttestationOutcome>),
    Errored(StageError),
}

impl PipelineState {
    /// The stage this state belongs to, if an attempt is in flight.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Hashing => Some(Stage::Hashing),
            PipelineState::AwaitingSignature => Some(Stage::AwaitingSignature),
            PipelineState::Uploading => Some(Stage::Uploading),
            PipelineState::Anchoring(_) => Some(Stage::Anchoring),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.stage().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete(_) | PipelineState::Errored(_))
    }

    pub fn outcome(&self) -> Option<&AttestationOutcome> {
        match self {
            PipelineState::Complete(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StageError> {
        match self {
            PipelineState::Errored(error) => Some(error),
            _ => None,
        }
    }

    /// Short status line for UIs.
    pub fn status_message(&self) -> String {
        match self {
            PipelineState::Idle => "Ready".to_string(),
            PipelineState::Hashing => "Hashing image...".to_string(),
            PipelineState::AwaitingSignature => "Waiting for signature...".to_string(),
            PipelineState::Uploading => "Uploading photo...".to_string(),
            PipelineState::Anchoring(AnchorPhase::Submitting) => {
                "Submitting to the ledger...".to_string()
            }
            PipelineState::Anchoring(AnchorPhase::Confirming { .. }) => {
                "Waiting for ledger confirmation...".to_string()
            }
            PipelineState::Complete(_) => "Photo attested and recorded".to_string(),
            PipelineState::Errored(e) => e.user_message(),
        }
    }
}
