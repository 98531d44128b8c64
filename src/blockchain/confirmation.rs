//! Confirmation monitoring for submitted transactions.

use alloy::primitives::TxHash;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus};

/// Something that can tell when a submitted transaction is final.
///
/// Waiting has no cancel handle: dropping the future only stops waiting,
/// the transaction itself stays submitted.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    /// Resolve to `Confirmed` or `Failed`, or error if the ledger cannot be
    /// queried or the wait deadline passes.
    async fn await_confirmation(&self, tx_hash: TxHash) -> BlockchainResult<ConfirmationStatus>;
}

/// Polls receipts until the transaction is buried deep enough.
#[derive(Debug, Clone)]
pub struct ConfirmationMonitor {
    client: BlockchainClient,
    poll_interval: Duration,
    deadline: Duration,
}

impl ConfirmationMonitor {
    pub fn new(client: BlockchainClient, poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            client,
            poll_interval,
            deadline,
        }
    }

    async fn poll_until_final(&self, tx_hash: TxHash) -> BlockchainResult<ConfirmationStatus> {
        let required = self.client.confirmation_blocks();
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let receipt = match self.client.get_transaction_receipt(tx_hash).await? {
                Some(r) => r,
                None => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
            };

            if !receipt.status() {
                return Ok(ConfirmationStatus::Failed {
                    reason: "transaction reverted".to_string(),
                });
            }

            let current_block = self.client.get_block_number().await?;
            let tx_block = receipt.block_number.unwrap_or(current_block);
            // The inclusion block itself counts as the first confirmation.
            let confirmations = (current_block.saturating_sub(tx_block) + 1) as u32;

            if confirmations >= required {
                return Ok(ConfirmationStatus::Confirmed {
                    block_number: tx_block,
                    confirmations,
                });
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations,
                required,
                "Waiting for confirmations"
            );
        }
    }
}

#[async_trait]
impl ConfirmationSource for ConfirmationMonitor {
    async fn await_confirmation(&self, tx_hash: TxHash) -> BlockchainResult<ConfirmationStatus> {
        match timeout(self.deadline, self.poll_until_final(tx_hash)).await {
            Ok(status) => status,
            Err(_) => Err(BlockchainError::ConfirmationTimeout(self.deadline.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BlockchainConfig;

    #[tokio::test]
    async fn test_unreachable_ledger_errors() {
        let config = BlockchainConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            rpc_timeout_secs: 1,
            ..BlockchainConfig::default()
        };
        let client = BlockchainClient::new(config).await.unwrap();
        let monitor =
            ConfirmationMonitor::new(client, Duration::from_millis(10), Duration::from_secs(5));

        let err = monitor.await_confirmation(TxHash::ZERO).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Rpc(_)));
    }
}
