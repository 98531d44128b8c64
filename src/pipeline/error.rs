//! Pipeline error taxonomy.
//!
//! Every component error is folded into [`AttestError`] at the orchestrator
//! boundary and tagged with the [`Stage`] it came from.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::anchor::AnchorError;
use crate::attestation::InputError;
use crate::identity::SignError;
use crate::pipeline::challenge::ChallengeError;
use crate::pipeline::state::Stage;
use crate::upload::{ArtifactReference, RejectionKind, UploadError};

pub type AttestResult<T> = Result<T, AttestError>;

/// Why an attestation attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttestError {
    /// The image or bundle failed local checks; nothing left the process.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("no identity connected")]
    NoIdentity,

    #[error("identity changed from {expected} to {actual}")]
    IdentityChanged { expected: Address, actual: Address },

    #[error("signing rejected: {reason}")]
    SigningRejected { reason: String },

    #[error("challenge unavailable: {reason}")]
    ChallengeUnavailable { reason: String },

    #[error("timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("upload rejected ({kind}, {status}): {message}")]
    UploadRejected {
        kind: RejectionKind,
        status: u16,
        message: String,
    },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("anchor submission failed: {reason}")]
    AnchorSubmit { reason: String },

    #[error("anchor {tx_hash} not confirmed: {reason}")]
    AnchorConfirm { tx_hash: TxHash, reason: String },

    /// Stopped waiting before the stage finished.
    #[error("attempt abandoned")]
    Abandoned,

    #[error("an attestation is already in progress")]
    Busy,
}

impl AttestError {
    /// The most specific user-facing explanation, when one is known.
    fn specific_message(&self) -> Option<String> {
        let message = match self {
            AttestError::InvalidInput { message } => format!("Invalid image: {}", message),
            AttestError::NoIdentity => "Please connect your wallet first.".to_string(),
            AttestError::IdentityChanged { .. } => {
                "Your wallet account changed during the attestation. Please try again.".to_string()
            }
            AttestError::SigningRejected { reason } if !reason.trim().is_empty() => {
                format!("Signature was not provided: {}", reason)
            }
            AttestError::ChallengeUnavailable { reason } if !reason.trim().is_empty() => {
                format!("Could not obtain a signing challenge: {}", reason)
            }
            AttestError::Timeout { .. } => {
                "Upload timed out. Please check your network connection and try again.".to_string()
            }
            AttestError::UploadRejected { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            AttestError::Transport { message } if !message.trim().is_empty() => {
                format!("Network error: {}", message)
            }
            AttestError::AnchorSubmit { reason } if !reason.trim().is_empty() => {
                format!("Ledger transaction was not submitted: {}", reason)
            }
            AttestError::AnchorConfirm { tx_hash, reason } => {
                format!("Ledger transaction {} did not confirm: {}", tx_hash, reason)
            }
            AttestError::Abandoned => "Attestation cancelled.".to_string(),
            AttestError::Busy => {
                "An attestation is already in progress. Please wait for it to finish.".to_string()
            }
            _ => return None,
        };
        Some(message)
    }
}

impl From<InputError> for AttestError {
    fn from(e: InputError) -> Self {
        AttestError::InvalidInput {
            message: e.to_string(),
        }
    }
}

impl From<SignError> for AttestError {
    fn from(e: SignError) -> Self {
        match e {
            SignError::NoIdentity => AttestError::NoIdentity,
            SignError::IdentityChanged { expected, actual } => {
                AttestError::IdentityChanged { expected, actual }
            }
            SignError::Rejected(reason) | SignError::Malformed(reason) => {
                AttestError::SigningRejected { reason }
            }
        }
    }
}

impl From<UploadError> for AttestError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::InvalidInput(_)
            | UploadError::UnsupportedMedia(_)
            | UploadError::PayloadTooLarge { .. } => AttestError::InvalidInput {
                message: e.to_string(),
            },
            UploadError::Timeout(after) => AttestError::Timeout { after },
            UploadError::Rejected {
                kind,
                status,
                message,
            } => AttestError::UploadRejected {
                kind,
                status,
                message,
            },
            UploadError::Network(message) | UploadError::InvalidResponse(message) => {
                AttestError::Transport { message }
            }
        }
    }
}

impl From<AnchorError> for AttestError {
    fn from(e: AnchorError) -> Self {
        match e {
            AnchorError::NoIdentity => AttestError::NoIdentity,
            AnchorError::IdentityChanged { expected, actual } => {
                AttestError::IdentityChanged { expected, actual }
            }
            AnchorError::Submit(reason) => AttestError::AnchorSubmit { reason },
            AnchorError::Confirm { tx_hash, reason } => {
                AttestError::AnchorConfirm { tx_hash, reason }
            }
        }
    }
}

impl From<ChallengeError> for AttestError {
    fn from(e: ChallengeError) -> Self {
        AttestError::ChallengeUnavailable {
            reason: e.to_string(),
        }
    }
}

/// A failure tagged with its originating stage.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{stage} failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    pub error: AttestError,
    /// Set when the image was already stored before the failure.
    pub artifact: Option<ArtifactReference>,
}

impl StageError {
    pub fn new(stage: Stage, error: AttestError) -> Self {
        Self {
            stage,
            error,
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: ArtifactReference) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// One message for the user: the most specific known cause, else a
    /// generic one naming the stage.
    pub fn user_message(&self) -> String {
        self.error.specific_message().unwrap_or_else(|| {
            format!(
                "Something went wrong while {}. Please try again.",
                self.stage.label()
            )
        })
    }
}

/// Errors returned by [`crate::pipeline::AttestationPipeline::attest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The attempt never started (`Busy`, nothing captured); state untouched.
    #[error("{0}")]
    Refused(AttestError),

    #[error(transparent)]
    Failed(#[from] StageError),
}

impl PipelineError {
    pub fn error(&self) -> &AttestError {
        match self {
            PipelineError::Refused(e) => e,
            PipelineError::Failed(e) => &e.error,
        }
    }

    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            PipelineError::Failed(e) => Some(e),
            PipelineError::Refused(_) => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Refused(e) => e.specific_message().unwrap_or_else(|| e.to_string()),
            PipelineError::Failed(e) => e.user_message(),
        }
    }
}
