//! Ledger access subsystem.
//!
//! # Data Flow
//! ```text
//! Anchor call data
//!     → transaction.rs (nonce, gas, local signing, raw broadcast)
//!     → client.rs (RPC with failover and per-call timeouts)
//!     → confirmation.rs (poll receipts until deep enough or reverted)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod confirmation;
pub mod transaction;
pub mod types;

pub use client::BlockchainClient;
pub use confirmation::{ConfirmationMonitor, ConfirmationSource};
pub use transaction::TxBuilder;
pub use types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId, ConfirmationStatus};
