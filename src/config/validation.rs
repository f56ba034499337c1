//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multipliers positive)
//! - Check that URLs and pool addresses parse for their chain
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SwapConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::chain::{Chain, ChainAddress};
use crate::config::schema::{PollStrategy, SwapConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const COMMITMENTS: [&str; 3] = ["processed", "confirmed", "finalized"];

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &SwapConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.keys.secret_env.trim().is_empty() {
        errors.push(ValidationError::new("keys.secret_env", "must not be empty"));
    }

    if !config.ethereum.enabled && !config.solana.enabled {
        errors.push(ValidationError::new("ethereum.enabled", "at least one chain must be enabled"));
    }

    let eth = &config.ethereum;
    if eth.enabled {
        check_url(&mut errors, "ethereum.rpc_url", &eth.rpc_url);
        for (i, url) in eth.failover_urls.iter().enumerate() {
            check_url(&mut errors, &format!("ethereum.failover_urls[{}]", i), url);
        }
        if eth.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new("ethereum.rpc_timeout_secs", "must be greater than 0"));
        }
        if eth.gas_limit < 21_000 {
            errors.push(ValidationError::new(
                "ethereum.gas_limit",
                "must cover a plain transfer (21000)",
            ));
        }
        if !eth.gas_price_multiplier.is_finite() || eth.gas_price_multiplier <= 0.0 {
            errors.push(ValidationError::new(
                "ethereum.gas_price_multiplier",
                "must be a positive number",
            ));
        }
        if eth.max_gas_price_gwei == 0 {
            errors.push(ValidationError::new("ethereum.max_gas_price_gwei", "must be greater than 0"));
        }
    }

    let sol = &config.solana;
    if sol.enabled {
        check_url(&mut errors, "solana.rpc_url", &sol.rpc_url);
        if sol.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new("solana.rpc_timeout_secs", "must be greater than 0"));
        }
        if !COMMITMENTS.contains(&sol.commitment.as_str()) {
            errors.push(ValidationError::new(
                "solana.commitment",
                format!("must be one of {}", COMMITMENTS.join(", ")),
            ));
        }
    }

    let poller = &config.poller;
    if poller.max_attempts == 0 {
        errors.push(ValidationError::new("poller.max_attempts", "must be at least 1"));
    }
    // Only the exponential schedule reads the ceiling
    if poller.strategy == PollStrategy::Exponential && poller.max_delay_ms < poller.base_delay_ms {
        errors.push(ValidationError::new(
            "poller.max_delay_ms",
            "must not be smaller than base_delay_ms",
        ));
    }
    if poller.deadline_secs == Some(0) {
        errors.push(ValidationError::new("poller.deadline_secs", "must be greater than 0 when set"));
    }

    for (i, entry) in config.pricing.rates.iter().enumerate() {
        if entry.rate <= rust_decimal::Decimal::ZERO {
            errors.push(ValidationError::new(
                format!("pricing.rates[{}].rate", i),
                "must be positive",
            ));
        }
        if entry.from.trim().is_empty() || entry.to.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("pricing.rates[{}]", i),
                "token symbols must not be empty",
            ));
        }
    }
    if config.pricing.timeout_secs == 0 {
        errors.push(ValidationError::new("pricing.timeout_secs", "must be greater than 0"));
    }

    for (chain, address) in &config.pools {
        if let Err(e) = ChainAddress::parse(*chain, address) {
            errors.push(ValidationError::new(format!("pools.{}", chain), e.to_string()));
        }
        if !chain_enabled(config, *chain) {
            errors.push(ValidationError::new(
                format!("pools.{}", chain),
                "pool configured for a disabled chain",
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn chain_enabled(config: &SwapConfig, chain: Chain) -> bool {
    match chain {
        Chain::Ethereum => config.ethereum.enabled,
        Chain::Solana => config.solana.enabled,
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
