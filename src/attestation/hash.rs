//! Content hashing for captured images.

use alloy::hex;
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::attestation::image::CapturedImage;
use crate::attestation::InputError;

/// SHA-256 digest of an image's encoded bytes.
///
/// Rendered as `0x`-prefixed lowercase hex. This is the sole identity of
/// "what was attested".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(B256);

impl ContentHash {
    /// The raw 32-byte digest.
    pub fn as_b256(&self) -> B256 {
        self.0
    }

    /// `0x`-prefixed hex form.
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(self.0.as_slice())
    }
}

impl From<B256> for ContentHash {
    fn from(digest: B256) -> Self {
        Self(digest)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash raw image bytes.
pub fn hash(bytes: &[u8]) -> Result<ContentHash, InputError> {
    if bytes.is_empty() {
        return Err(InputError::Empty);
    }
    let digest = Sha256::digest(bytes);
    Ok(ContentHash(B256::from_slice(digest.as_slice())))
}

/// Hash the binary payload of a `data:` URL, stripping the envelope first.
pub fn hash_data_url(data_url: &str) -> Result<ContentHash, InputError> {
    let image = CapturedImage::from_data_url(data_url)?;
    hash(image.bytes())
}
