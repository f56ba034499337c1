//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the swap
//! service. All types derive Serde traits for deserialization from config
//! files, and every section falls back to defaults so a minimal file works.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chain::Chain;

/// Root configuration for the swap service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SwapConfig {
    /// Where the secret phrase comes from.
    pub keys: KeysConfig,

    /// Ethereum node settings.
    pub ethereum: EthereumConfig,

    /// Solana node settings.
    pub solana: SolanaConfig,

    /// Confirmation lookup policy.
    pub poller: PollerConfig,

    /// Exchange-rate source.
    pub pricing: PricingConfig,

    /// Pool (source) address per chain. Chains without an entry pay out from
    /// the derived address.
    pub pools: BTreeMap<Chain, String>,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Key material settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Environment variable holding the secret phrase.
    pub secret_env: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            secret_env: "SWAP_SECRET_PHRASE".to_string(),
        }
    }
}

/// Ethereum integration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EthereumConfig {
    /// Enable the Ethereum adapter.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// EIP-155 chain id used for signing (1337 for a local dev node).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Gas limit of a plain value transfer.
    pub gas_limit: u64,

    /// Gas price multiplier (1.0 = estimated, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1337,
            rpc_timeout_secs: 10,
            gas_limit: 21_000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
        }
    }
}

/// Solana integration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolanaConfig {
    /// Enable the Solana adapter.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Commitment level for reads (processed, confirmed, finalized).
    pub commitment: String,

    /// Fee charged per signature, in lamports.
    pub lamports_per_signature: u64,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rpc_url: "http://localhost:8899".to_string(),
            rpc_timeout_secs: 10,
            commitment: "confirmed".to_string(),
            lamports_per_signature: 5_000,
        }
    }
}

/// Delay schedule between confirmation lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStrategy {
    /// Same delay between every attempt.
    Fixed,
    /// Doubling delay with jitter, capped at `max_delay_ms`.
    Exponential,
}

/// Confirmation poller settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    pub strategy: PollStrategy,

    /// Maximum adapter calls per lookup.
    pub max_attempts: u32,

    /// Fixed delay, or first exponential delay, in milliseconds.
    pub base_delay_ms: u64,

    /// Ceiling for exponential delays in milliseconds.
    pub max_delay_ms: u64,

    /// Wall-clock bound for one lookup. `None` disables the deadline.
    pub deadline_secs: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            strategy: PollStrategy::Exponential,
            max_attempts: 10,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            deadline_secs: Some(120),
        }
    }
}

/// Which rate source backs the quote engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingSource {
    /// Configured table in `pricing.rates`.
    Fixed,
    /// HTTP price-by-symbol feed.
    Feed,
}

/// One configured exchange rate: 1 `from` buys `rate` `to`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateEntry {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
}

/// Exchange-rate settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    pub source: PricingSource,

    /// Rates used by the fixed source.
    pub rates: Vec<RateEntry>,

    /// Price-by-symbol endpoint used by the feed source.
    pub feed_url: String,

    /// Environment variable holding the feed API key.
    pub api_key_env: String,

    /// Feed request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            source: PricingSource::Fixed,
            rates: Vec::new(),
            feed_url: "https://api.g.alchemy.com/prices/v1/tokens/by-symbol".to_string(),
            api_key_env: "PRICE_FEED_API_KEY".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
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
