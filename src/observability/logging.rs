//! Structured logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("photo_attest={},warn", config.log_level.to_ascii_lowercase()))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Shorten a hex value for logs (`0x12345678…abcd`).
pub fn abbreviate(value: &str) -> String {
    let chars = value.chars().count();
    if chars <= 16 {
        return value.to_string();
    }
    let head: String = value.chars().take(10).collect();
    let tail: String = value.chars().skip(chars - 4).collect();
    format!("{}…{}", head, tail)
}
