//! Logging and metrics for the authorization engine.
//!
//! # Privacy by Default
//!
//! Entry points use `#[instrument(skip_all)]` and add only safe fields.
//! Fields fall in three groups:
//! - **SAFE**: logged as-is (profile names, issuers, audiences, failure reasons)
//! - **HASHED**: SHA-256 correlation hash only (identity ids, anti-forgery tokens)
//! - **NEVER**: must not appear in logs (keys, uids, encoded tokens)

pub mod metrics;

pub use metrics::{record_bearer_auth, record_token_issuance, record_token_validation};

use common::config::ObservabilityConfig;
use sha2::{Digest, Sha256};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for identity ids and anti-forgery tokens, which need correlation
/// across log entries but must not be stored in plaintext.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    // 8 hex chars (32 bits) is enough for correlation
    hex::encode(result.get(..4).unwrap_or_default())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level`. Returns `false` if a subscriber
/// was already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.is_ok()
}
