//! Ledger anchor client.
//!
//! Anchoring is two-phase. [`LedgerAnchorClient::submit`] hands the call to
//! the identity holder and returns once the transaction is accepted;
//! [`LedgerAnchorClient::confirm`] then waits for finality. Either phase can
//! fail on its own, and neither can be retracted once started.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::Signature;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::anchor::contract::anchor_calldata;
use crate::attestation::{ContentHash, Timestamp};
use crate::blockchain::{ConfirmationSource, ConfirmationStatus};
use crate::identity::{IdentityProvider, WalletError};
use crate::observability::logging::abbreviate;
use crate::observability::metrics;
use crate::upload::ArtifactReference;

/// Errors raised while anchoring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("no identity connected")]
    NoIdentity,

    #[error("identity changed from {expected} to {actual}")]
    IdentityChanged { expected: Address, actual: Address },

    /// Not accepted for inclusion (declined, unfunded, estimation revert).
    #[error("anchor transaction not submitted: {0}")]
    Submit(String),

    /// Accepted but never became final (reverted, dropped, deadline).
    #[error("anchor transaction {tx_hash} not confirmed: {reason}")]
    Confirm { tx_hash: TxHash, reason: String },
}

/// A transaction accepted for inclusion but not yet final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAnchor {
    pub tx_hash: TxHash,
    pub submitter: Address,
}

/// Ledger confirmation of an anchored attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationReceipt {
    pub tx_hash: TxHash,
    pub submitter: Address,
    pub contract: Address,
    pub finality: ConfirmationStatus,
}

impl AttestationReceipt {
    /// Block the anchor transaction was included in.
    pub fn block_number(&self) -> Option<u64> {
        match self.finality {
            ConfirmationStatus::Confirmed { block_number, .. } => Some(block_number),
            _ => None,
        }
    }
}

/// Submits attestations to the registry contract and awaits finality.
#[derive(Clone)]
pub struct LedgerAnchorClient {
    identity: Arc<dyn IdentityProvider>,
    confirmations: Arc<dyn ConfirmationSource>,
    contract: Address,
}

impl LedgerAnchorClient {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        confirmations: Arc<dyn ConfirmationSource>,
        contract: Address,
    ) -> Self {
        Self {
            identity,
            confirmations,
            contract,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Phase one: have `submitter` send the anchor transaction.
    ///
    /// Taking an [`ArtifactReference`] means an anchor can only be built
    /// from a completed upload.
    pub async fn submit(
        &self,
        artifact: &ArtifactReference,
        content_hash: &ContentHash,
        timestamp: Timestamp,
        signature: &Signature,
        submitter: Address,
    ) -> Result<PendingAnchor, AnchorError> {
        match self.identity.current_identity() {
            None => return Err(AnchorError::NoIdentity),
            Some(actual) if actual != submitter => {
                return Err(AnchorError::IdentityChanged {
                    expected: submitter,
                    actual,
                })
            }
            Some(_) => {}
        }

        let calldata = anchor_calldata(artifact.url(), content_hash, timestamp, signature);
        let tx = TransactionRequest::default()
            .with_from(submitter)
            .with_to(self.contract)
            .with_input(calldata);

        tracing::info!(
            contract = %self.contract,
            artifact = %artifact.url(),
            content_hash = %abbreviate(&content_hash.to_hex()),
            "Submitting anchor transaction"
        );

        let tx_hash = self.identity.submit_transaction(tx).await.map_err(|e| match e {
            WalletError::Disconnected => AnchorError::NoIdentity,
            other => AnchorError::Submit(other.to_string()),
        })?;

        tracing::info!(tx_hash = %tx_hash, "Anchor transaction submitted");
        Ok(PendingAnchor { tx_hash, submitter })
    }

    /// Phase two: wait until the transaction is final.
    pub async fn confirm(&self, pending: PendingAnchor) -> Result<AttestationReceipt, AnchorError> {
        let tx_hash = pending.tx_hash;
        let status = self
            .confirmations
            .await_confirmation(tx_hash)
            .await
            .map_err(|e| {
                metrics::record_confirmation("error");
                AnchorError::Confirm {
                    tx_hash,
                    reason: e.to_string(),
                }
            })?;

        match status {
            ConfirmationStatus::Confirmed { block_number, confirmations } => {
                metrics::record_confirmation("confirmed");
                tracing::info!(tx_hash = %tx_hash, block_number, confirmations, "Anchor confirmed");
                Ok(AttestationReceipt {
                    tx_hash,
                    submitter: pending.submitter,
                    contract: self.contract,
                    finality: status,
                })
            }
            ConfirmationStatus::Failed { reason } => {
                metrics::record_confirmation("failed");
                Err(AnchorError::Confirm { tx_hash, reason })
            }
            other => {
                metrics::record_confirmation("error");
                Err(AnchorError::Confirm {
                    tx_hash,
                    reason: format!("confirmation ended without finality ({:?})", other),
                })
            }
        }
    }

    /// Both phases back to back.
    pub async fn anchor(
        &self,
        artifact: &ArtifactReference,
        content_hash: &ContentHash,
        timestamp: Timestamp,
        signature: &Signature,
        submitter: Address,
    ) -> Result<AttestationReceipt, AnchorError> {
        let pending = self
            .submit(artifact, content_hash, timestamp, signature, submitter)
            .await?;
        self.confirm(pending).await
    }
}

impl std::fmt::Debug for LedgerAnchorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerAnchorClient")
            .field("contract", &self.contract)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::hash;
    use crate::blockchain::{BlockchainError, BlockchainResult};
    use crate::upload::PhotoMetadata;
    use alloy::primitives::{Bytes, U256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingIdentity {
        identity: Option<Address>,
        submitted: Mutex<Vec<TransactionRequest>>,
        reject: bool,
    }

    #[async_trait]
    impl IdentityProvider for RecordingIdentity {
        fn current_identity(&self) -> Option<Address> {
            self.identity
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Bytes, WalletError> {
            Err(WalletError::Disconnected)
        }

        async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
            self.submitted.lock().unwrap().push(tx);
            if self.reject {
                Err(WalletError::Rejected("user denied transaction".to_string()))
            } else {
                Ok(TxHash::repeat_byte(0xab))
            }
        }
    }

    struct FixedConfirmation(Result<ConfirmationStatus, &'static str>);

    #[async_trait]
    impl ConfirmationSource for FixedConfirmation {
        async fn await_confirmation(&self, _tx_hash: TxHash) -> BlockchainResult<ConfirmationStatus> {
            self.0.clone().map_err(|e| BlockchainError::Rpc(e.to_string()))
        }
    }

    fn artifact() -> ArtifactReference {
        ArtifactReference {
            url: "photos/photo_1.jpeg".to_string(),
            photo: PhotoMetadata {
                id: 1,
                file_name: "photo_1.jpeg".to_string(),
                file_path: "photos/photo_1.jpeg".to_string(),
                mime_type: "image/jpeg".to_string(),
                file_size: 3,
                created_at: None,
                updated_at: None,
            },
        }
    }

    fn client(
        identity: Arc<RecordingIdentity>,
        status: Result<ConfirmationStatus, &'static str>,
    ) -> LedgerAnchorClient {
        LedgerAnchorClient::new(
            identity,
            Arc::new(FixedConfirmation(status)),
            Address::repeat_byte(0xcc),
        )
    }

    fn signature() -> Signature {
        Signature::new(U256::from(1), U256::from(2), false)
    }

    #[tokio::test]
    async fn test_anchor_success() {
        let submitter = Address::repeat_byte(1);
        let identity = Arc::new(RecordingIdentity {
            identity: Some(submitter),
            submitted: Mutex::new(Vec::new()),
            reject: false,
        });
        let confirmed = ConfirmationStatus::Confirmed { block_number: 12, confirmations: 1 };
        let anchor = client(identity.clone(), Ok(confirmed.clone()));

        let receipt = anchor
            .anchor(&artifact(), &hash(b"abc").unwrap(), 100, &signature(), submitter)
            .await
            .unwrap();
        assert_eq!(receipt.tx_hash, TxHash::repeat_byte(0xab));
        assert_eq!(receipt.finality, confirmed);
        assert_eq!(receipt.block_number(), Some(12));

        let submitted = identity.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].from, Some(submitter));
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let submitter = Address::repeat_byte(1);
        let identity = Arc::new(RecordingIdentity {
            identity: Some(submitter),
            submitted: Mutex::new(Vec::new()),
            reject: true,
        });
        let anchor = client(identity, Ok(ConfirmationStatus::Pending));

        let err = anchor
            .submit(&artifact(), &hash(b"abc").unwrap(), 100, &signature(), submitter)
            .await
            .unwrap_err();
        assert!(matches!(err, AnchorError::Submit(ref m) if m.contains("user denied")));
    }

    #[tokio::test]
    async fn test_submit_requires_same_identity() {
        let identity = Arc::new(RecordingIdentity {
            identity: Some(Address::repeat_byte(2)),
            submitted: Mutex::new(Vec::new()),
            reject: false,
        });
        let anchor = client(identity.clone(), Ok(ConfirmationStatus::Pending));

        let err = anchor
            .submit(&artifact(), &hash(b"abc").unwrap(), 100, &signature(), Address::repeat_byte(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AnchorError::IdentityChanged { .. }));
        assert!(identity.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_failures() {
        let identity = Arc::new(RecordingIdentity {
            identity: Some(Address::repeat_byte(1)),
            submitted: Mutex::new(Vec::new()),
            reject: false,
        });
        let pending = PendingAnchor {
            tx_hash: TxHash::repeat_byte(0xab),
            submitter: Address::repeat_byte(1),
        };

        let reverted = client(
            identity.clone(),
            Ok(ConfirmationStatus::Failed { reason: "transaction reverted".to_string() }),
        );
        let err = reverted.confirm(pending).await.unwrap_err();
        assert!(matches!(err, AnchorError::Confirm { ref reason, .. } if reason == "transaction reverted"));

        let unreachable = client(identity, Err("connection refused"));
        let err = unreachable.confirm(pending).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
