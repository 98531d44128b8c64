//! Photo registry contract interface.

use alloy::primitives::{Bytes, U256};
use alloy::signers::Signature;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::attestation::{ContentHash, Timestamp};

sol! {
    /// Registry the attestations are anchored to.
    interface IPhotoRegistry {
        /// Record an attestation. Reverts if the signature is malformed.
        function anchorPhoto(string artifactUrl, string imageHash, uint256 timestamp, bytes signature) external;
    }
}

/// ABI-encoded `anchorPhoto` call data.
pub fn anchor_calldata(
    artifact_url: &str,
    content_hash: &ContentHash,
    timestamp: Timestamp,
    signature: &Signature,
) -> Bytes {
    IPhotoRegistry::anchorPhotoCall {
        artifactUrl: artifact_url.to_string(),
        imageHash: content_hash.to_hex(),
        timestamp: U256::from(timestamp),
        signature: Bytes::from(signature.as_bytes().to_vec()),
    }
    .abi_encode()
    .into()
}
