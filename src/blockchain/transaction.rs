//! Transaction building, local signing, and broadcast.
//!
//! # Responsibilities
//! - Sync the nonce from chain before every submission
//! - Enforce the gas price ceiling and apply the safety multiplier
//! - Estimate gas and refuse to submit when the balance cannot cover it
//! - Sign locally (EIP-155 legacy) and broadcast the raw envelope

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Gas headroom applied on top of the node's estimate, in percent.
const GAS_LIMIT_HEADROOM_PCT: u64 = 20;

/// Prepares and submits transactions on behalf of a local key.
pub struct TxBuilder {
    client: BlockchainClient,
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl TxBuilder {
    pub fn new(client: BlockchainClient, signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self {
            client,
            signer,
            chain_id,
        }
    }

    /// Fill nonce, gas price, gas limit and chain ID on a call request.
    pub async fn prepare(&self, tx: TransactionRequest) -> BlockchainResult<TransactionRequest> {
        let from = self.signer.address();
        let nonce = self.client.get_transaction_count(from).await?;

        let gas_price = self.client.get_gas_price().await?;
        let gas_price_gwei = gas_price / 1_000_000_000;

        let config = self.client.config();
        if gas_price_gwei > config.max_gas_price_gwei as u128 {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: gas_price_gwei as u64,
                max_gwei: config.max_gas_price_gwei,
            });
        }

        let adjusted_gas_price = (gas_price as f64 * config.gas_price_multiplier) as u128;

        let tx = tx
            .with_from(from)
            .with_nonce(nonce)
            .with_gas_price(adjusted_gas_price)
            .with_chain_id(self.chain_id);

        let estimate = self.client.estimate_gas(&tx).await?;
        let gas_limit = estimate + estimate * GAS_LIMIT_HEADROOM_PCT / 100;

        let max_cost = U256::from(gas_limit) * U256::from(adjusted_gas_price);
        let balance = self.client.get_balance(from).await?;
        if balance < max_cost {
            return Err(BlockchainError::Wallet(format!(
                "insufficient funds: balance {} wei, up to {} wei required",
                balance, max_cost
            )));
        }

        tracing::debug!(
            from = %from,
            nonce,
            gas_limit,
            gas_price = adjusted_gas_price,
            "Transaction prepared"
        );

        Ok(tx.with_gas_limit(gas_limit))
    }

    /// Prepare, sign and broadcast. Returns once the node accepted the
    /// transaction into its pool; inclusion is not awaited.
    pub async fn sign_and_send(&self, tx: TransactionRequest) -> BlockchainResult<TxHash> {
        let tx = self.prepare(tx).await?;
        let nonce = tx.nonce;

        let wallet = EthereumWallet::from(self.signer.clone());
        let envelope = tx
            .build(&wallet)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Transaction signing failed: {}", e)))?;

        let tx_hash = self.client.send_raw_transaction(&envelope.encoded_2718()).await?;

        tracing::info!(tx_hash = %tx_hash, nonce = ?nonce, "Transaction broadcast");
        Ok(tx_hash)
    }

    pub fn address(&self) -> alloy::primitives::Address {
        self.signer.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BlockchainConfig;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_prepare_surfaces_rpc_failure() {
        let config = BlockchainConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            rpc_timeout_secs: 2,
            ..BlockchainConfig::default()
        };
        let client = BlockchainClient::new(config).await.unwrap();
        let signer: PrivateKeySigner = TEST_PRIVATE_KEY.parse().unwrap();
        let builder = TxBuilder::new(client, signer, 31337);

        assert_eq!(
            builder.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );

        let err = builder.prepare(TransactionRequest::default()).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Rpc(_)));
    }
}
