//! Identity (wallet) boundary.
//!
//! The pipeline never owns wallet lifecycle. It asks an [`IdentityProvider`]
//! for the current identity at each stage entry and delegates signing and
//! transaction submission to it.
//!
//! Both delegated calls may suspend indefinitely while the holder decides
//! (a wallet prompt, a hardware confirmation). They are plain futures with
//! no cancel handle: dropping one stops waiting, nothing more.

pub mod local;
pub mod signer;

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::BlockchainError;

pub use local::{LocalWallet, PRIVATE_KEY_ENV_VAR};
pub use signer::{SignError, SignerAdapter};

/// Errors reported by an identity provider.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The holder declined the request.
    #[error("rejected by identity holder: {0}")]
    Rejected(String),

    /// No identity is connected.
    #[error("no identity connected")]
    Disconnected,

    /// The ledger refused or could not process the request.
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
}

/// Externally-held signing identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently connected address, if any.
    fn current_identity(&self) -> Option<Address>;

    /// Personal-sign (EIP-191) `message`, returning the raw signature bytes.
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, WalletError>;

    /// Submit a transaction, returning its hash once accepted for inclusion.
    async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError>;
}
