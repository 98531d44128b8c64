//! Canonical attestation messages.
//!
//! The message is the Ethereum ABI encoding of the tuple
//! `(bytes32 contentHash, string challenge, uint256 timestamp)`. Every field
//! occupies a fixed-width head word and the string tail is length-prefixed,
//! so no two distinct triples share an encoding. What the identity actually
//! signs is the keccak256 digest of that encoding.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::signers::Signature;
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attestation::hash::ContentHash;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Opaque value correlating a signing session with one attestation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Challenge(String);

impl Challenge {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Challenge {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Challenge {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The canonical byte string a signer is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationMessage {
    encoded: Bytes,
    digest: B256,
}

impl AttestationMessage {
    /// ABI-encoded `(bytes32, string, uint256)`.
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    /// keccak256 of the encoding; the payload handed to the signer.
    pub fn digest(&self) -> B256 {
        self.digest
    }

    /// Recover the address that produced `signature` over this message
    /// (EIP-191 personal-sign over the digest).
    pub fn recover_signer(&self, signature: &Signature) -> Result<Address, alloy::primitives::SignatureError> {
        signature.recover_address_from_msg(self.digest.as_slice())
    }
}

/// Build the canonical message for a `(hash, challenge, timestamp)` triple.
pub fn build_message(
    content_hash: &ContentHash,
    challenge: &Challenge,
    timestamp: Timestamp,
) -> AttestationMessage {
    let encoded = (
        content_hash.as_b256(),
        challenge.as_str().to_string(),
        U256::from(timestamp),
    )
        .abi_encode_params();
    let digest = keccak256(&encoded);

    AttestationMessage {
        encoded: Bytes::from(encoded),
        digest,
    }
}
