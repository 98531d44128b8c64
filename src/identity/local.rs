//! Local keystore identity.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;

use crate::blockchain::{BlockchainClient, BlockchainError, BlockchainResult, TxBuilder};
use crate::identity::{IdentityProvider, WalletError};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "PHOTO_ATTEST_PRIVATE_KEY";

/// Identity backed by a private key held in process memory.
///
/// Signs without prompting. Transaction submission needs an RPC client
/// attached with [`LocalWallet::with_client`].
#[derive(Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    chain_id: u64,
    client: Option<BlockchainClient>,
}

impl LocalWallet {
    /// Create a wallet from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let signer = signer.with_chain_id(Some(chain_id));

        tracing::info!(address = %signer.address(), chain_id, "Wallet initialized");

        Ok(Self {
            signer,
            chain_id,
            client: None,
        })
    }

    /// Load the key from `PHOTO_ATTEST_PRIVATE_KEY`.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// Attach the RPC client used for transaction submission.
    pub fn with_client(mut self, client: BlockchainClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.signer.address())
            .field("chain_id", &self.chain_id)
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for LocalWallet {
    fn current_identity(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, WalletError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| WalletError::Rejected(format!("Message signing failed: {}", e)))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    async fn submit_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        let client = self.client.clone().ok_or_else(|| {
            BlockchainError::NotAvailable("no RPC client attached to wallet".to_string())
        })?;

        TxBuilder::new(client, self.signer.clone(), self.chain_id)
            .sign_and_send(tx)
            .await
            .map_err(WalletError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::Signature;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, 31337).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
        assert_eq!(wallet.current_identity(), Some(wallet.address()));
        assert_eq!(wallet.chain_id(), 31337);
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = LocalWallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), 1).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_invalid_private_key() {
        let err = LocalWallet::from_private_key("invalid_key", 1).unwrap_err();
        assert!(err.to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(!debug.contains(TEST_PRIVATE_KEY));
    }

    #[tokio::test]
    async fn test_sign_message_recovers_to_wallet() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        let raw = wallet.sign_message(b"Hello, World!").await.unwrap();
        assert_eq!(raw.len(), 65);

        let signature = Signature::try_from(&raw[..]).unwrap();
        let recovered = signature.recover_address_from_msg(b"Hello, World!").unwrap();
        assert_eq!(recovered, wallet.address());
    }

    #[tokio::test]
    async fn test_submit_without_client() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        let err = wallet
            .submit_transaction(TransactionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Blockchain(BlockchainError::NotAvailable(_))));
    }
}
