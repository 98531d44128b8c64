//! Signature bundles submitted alongside uploads and ledger anchors.

use alloy::hex;
use alloy::primitives::Address;
use alloy::signers::Signature;
use serde::{Deserialize, Serialize};

use crate::attestation::hash::ContentHash;
use crate::attestation::message::{Challenge, Timestamp};
use crate::attestation::InputError;

/// Everything needed to verify who attested which image, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    /// Signature over the attestation message digest.
    pub signature: Signature,
    /// Hash of the attested image.
    pub content_hash: ContentHash,
    /// Challenge the signing session was bound to.
    pub challenge: Challenge,
    /// Unix seconds at which the message was built.
    pub timestamp: Timestamp,
    /// Address that produced the signature.
    pub identity: Address,
}

impl SignedAttestation {
    /// Check every field is populated.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.challenge.is_empty() {
            return Err(InputError::IncompleteBundle("challenge"));
        }
        if self.timestamp == 0 {
            return Err(InputError::IncompleteBundle("timestamp"));
        }
        if self.identity == Address::ZERO {
            return Err(InputError::IncompleteBundle("wallet_address"));
        }
        Ok(())
    }

    /// `0x`-prefixed 65-byte signature hex.
    pub fn signature_hex(&self) -> String {
        hex::encode_prefixed(self.signature.as_bytes())
    }
}

/// What accompanies an upload: either nothing, or a full attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureBundle {
    /// Plain artifact upload without provenance fields.
    Unsigned,
    /// Upload carrying a complete attestation.
    Signed(SignedAttestation),
}

impl SignatureBundle {
    /// Validate a signed bundle; unsigned bundles are always valid.
    pub fn validate(&self) -> Result<(), InputError> {
        match self {
            SignatureBundle::Unsigned => Ok(()),
            SignatureBundle::Signed(attestation) => attestation.validate(),
        }
    }

    /// Multipart form fields carried next to the `photo` part.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            SignatureBundle::Unsigned => Vec::new(),
            SignatureBundle::Signed(a) => vec![
                ("signature", a.signature_hex()),
                ("imageHash", a.content_hash.to_hex()),
                ("challenge", a.challenge.to_string()),
                ("timestamp", a.timestamp.to_string()),
                ("wallet_address", a.identity.to_string()),
            ],
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, SignatureBundle::Signed(_))
    }
}
