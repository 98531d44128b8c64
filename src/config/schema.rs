//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the attestation pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AttestConfig {
    /// Storage backend settings.
    pub upload: UploadConfig,

    /// Ledger RPC settings.
    pub blockchain: BlockchainConfig,

    /// Anchor contract settings.
    pub anchor: AnchorConfig,

    /// Challenge sourcing.
    pub challenge: ChallengeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// API base URL; `/photos` is appended.
    pub base_url: String,

    /// Hard deadline for an upload, in seconds.
    pub timeout_secs: u64,

    /// Deadline for listing and deletion calls, in seconds.
    pub list_timeout_secs: u64,

    /// Largest image accepted for upload, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            list_timeout_secs: 10,
            max_payload_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Ledger RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of blocks (inclusion block counted) required for finality.
    pub confirmation_blocks: u32,

    /// Gas price multiplier (1.0 = estimated, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
        }
    }
}

/// Anchor contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Address of the photo registry contract. Required for `attest`.
    pub contract_address: String,

    /// How long to wait for finality before giving up, in seconds.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            confirmation_timeout_secs: 300,
            poll_interval_ms: 2000,
        }
    }
}

/// Challenge sourcing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Fixed challenge value bound into every attestation.
    pub value: String,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            value: "photo-attest-v1".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
