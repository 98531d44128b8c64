//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: AttestConfig → Result<(), Vec<ValidationError>>

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::AttestConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AttestConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_http_url(&mut errors, "upload.base_url", &config.upload.base_url);
    if config.upload.timeout_secs == 0 {
        errors.push(ValidationError::new("upload.timeout_secs", "must be greater than 0"));
    }
    if config.upload.list_timeout_secs == 0 {
        errors.push(ValidationError::new("upload.list_timeout_secs", "must be greater than 0"));
    }
    if config.upload.max_payload_bytes == 0 {
        errors.push(ValidationError::new("upload.max_payload_bytes", "must be greater than 0"));
    }

    check_http_url(&mut errors, "blockchain.rpc_url", &config.blockchain.rpc_url);
    for url in &config.blockchain.failover_urls {
        check_http_url(&mut errors, "blockchain.failover_urls", url);
    }
    if config.blockchain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.blockchain.confirmation_blocks == 0 {
        errors.push(ValidationError::new(
            "blockchain.confirmation_blocks",
            "must be at least 1",
        ));
    }
    if !(config.blockchain.gas_price_multiplier >= 1.0) {
        errors.push(ValidationError::new(
            "blockchain.gas_price_multiplier",
            "must be at least 1.0",
        ));
    }

    if !config.anchor.contract_address.is_empty()
        && config.anchor.contract_address.parse::<Address>().is_err()
    {
        errors.push(ValidationError::new(
            "anchor.contract_address",
            format!("'{}' is not a valid address", config.anchor.contract_address),
        ));
    }
    if config.anchor.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "anchor.confirmation_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.anchor.poll_interval_ms == 0 {
        errors.push(ValidationError::new("anchor.poll_interval_ms", "must be greater than 0"));
    }

    if config.challenge.value.trim().is_empty() {
        errors.push(ValidationError::new("challenge.value", "must not be empty"));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{}': {}", value, e))),
    }
}
