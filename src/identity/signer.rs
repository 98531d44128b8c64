//! Signer adapter: turns an attestation message into a checked signature.

use alloy::primitives::Address;
use alloy::signers::Signature;
use std::sync::Arc;
use thiserror::Error;

use crate::attestation::AttestationMessage;
use crate::identity::{IdentityProvider, WalletError};

/// Why a signature could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("no identity connected")]
    NoIdentity,

    #[error("identity changed from {expected} to {actual}")]
    IdentityChanged { expected: Address, actual: Address },

    #[error("signing rejected: {0}")]
    Rejected(String),

    #[error("malformed signature: {0}")]
    Malformed(String),
}

/// Obtains signatures from an external identity and validates them before use.
#[derive(Clone)]
pub struct SignerAdapter {
    provider: Arc<dyn IdentityProvider>,
}

impl SignerAdapter {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// The identity currently established with the provider.
    pub fn identity(&self) -> Result<Address, SignError> {
        self.provider.current_identity().ok_or(SignError::NoIdentity)
    }

    /// Ensure `expected` is still the connected identity.
    pub fn ensure_identity(&self, expected: Address) -> Result<(), SignError> {
        match self.provider.current_identity() {
            None => Err(SignError::NoIdentity),
            Some(actual) if actual != expected => {
                Err(SignError::IdentityChanged { expected, actual })
            }
            Some(_) => Ok(()),
        }
    }

    /// Ask `requester` to sign `message`.
    ///
    /// May wait indefinitely for the holder's approval. A rejection is final
    /// for the attempt. The returned signature is guaranteed to be 65 bytes
    /// and to recover to `requester`.
    pub async fn sign(
        &self,
        message: &AttestationMessage,
        requester: Address,
    ) -> Result<Signature, SignError> {
        self.ensure_identity(requester)?;

        tracing::debug!(identity = %requester, digest = %message.digest(), "Requesting signature");

        let raw = self
            .provider
            .sign_message(message.digest().as_slice())
            .await
            .map_err(|e| match e {
                WalletError::Disconnected => SignError::NoIdentity,
                other => SignError::Rejected(other.to_string()),
            })?;

        let signature = Signature::try_from(&raw[..]).map_err(|e| {
            SignError::Malformed(format!("{} ({} bytes returned)", e, raw.len()))
        })?;

        let recovered = message
            .recover_signer(&signature)
            .map_err(|e| SignError::Malformed(e.to_string()))?;
        if recovered != requester {
            return Err(SignError::Rejected(format!(
                "signature recovers to {}, expected {}",
                recovered, requester
            )));
        }

        Ok(signature)
    }
}

impl std::fmt::Debug for SignerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerAdapter")
            .field("identity", &self.provider.current_identity())
            .finish()
    }
}
