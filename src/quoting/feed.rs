//! HTTP price-by-symbol rate source.
//!
//! Queries `{feed_url}?symbols=FROM&symbols=TO` with a bearer API key and
//! derives the rate as `price(FROM) / price(TO)`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::config::schema::PricingConfig;
use crate::error::{ChainResult, ErrorKind};
use crate::quoting::engine::RateSource;

#[derive(Debug, Deserialize)]
struct PricesResponse {
    data: Vec<TokenPrices>,
}

#[derive(Debug, Deserialize)]
struct TokenPrices {
    symbol: String,
    #[serde(default)]
    prices: Vec<PricePoint>,
}

#[derive(Debug, Deserialize)]
struct PricePoint {
    value: String,
}

/// Rate source backed by a remote price feed.
#[derive(Clone)]
pub struct PriceFeed {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl PriceFeed {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> ChainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ErrorKind::PricingUnavailable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            http,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from configuration, reading the API key from the environment.
    pub fn from_config(config: &PricingConfig) -> ChainResult<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ErrorKind::PricingUnavailable(format!(
                "environment variable {} not set",
                config.api_key_env
            ))
        })?;
        Self::new(
            config.feed_url.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn fetch(&self, symbols: &[&str]) -> ChainResult<PricesResponse> {
        let query: Vec<(&str, &str)> = symbols.iter().map(|s| ("symbols", *s)).collect();
        let response = self
            .http
            .get(&self.url)
            .query(&query)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ErrorKind::PricingUnavailable(format!("price feed unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorKind::PricingUnavailable(format!(
                "price feed returned status {}",
                status
            )));
        }
        response
            .json::<PricesResponse>()
            .await
            .map_err(|e| ErrorKind::PricingUnavailable(format!("unreadable price feed response: {}", e)))
    }
}

fn price_of(response: &PricesResponse, symbol: &str) -> ChainResult<Decimal> {
    let price = response
        .data
        .iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
        .and_then(|t| t.prices.first())
        .ok_or_else(|| ErrorKind::PricingUnavailable(format!("price not found for {}", symbol)))?;
    let value = Decimal::from_str(&price.value)
        .or_else(|_| Decimal::from_scientific(&price.value))
        .map_err(|e| {
            ErrorKind::PricingUnavailable(format!("bad price '{}' for {}: {}", price.value, symbol, e))
        })?;
    if value <= Decimal::ZERO {
        return Err(ErrorKind::PricingUnavailable(format!(
            "non-positive price {} for {}",
            value, symbol
        )));
    }
    Ok(value)
}

#[async_trait]
impl RateSource for PriceFeed {
    async fn rate(&self, from_token: &str, to_token: &str) -> ChainResult<Decimal> {
        let from = from_token.to_ascii_uppercase();
        let to = to_token.to_ascii_uppercase();
        if from == to {
            return Ok(Decimal::ONE);
        }

        let response = self.fetch(&[&from, &to]).await?;
        let from_price = price_of(&response, &from)?;
        let to_price = price_of(&response, &to)?;

        let rate = from_price.checked_div(to_price).ok_or_else(|| {
            ErrorKind::PricingUnavailable(format!("cannot divide {} by {}", from_price, to_price))
        })?;
        tracing::debug!(from = %from, to = %to, %from_price, %to_price, %rate, "Fetched feed rate");
        Ok(rate)
    }

    fn name(&self) -> &'static str {
        "feed"
    }
}

impl std::fmt::Debug for PriceFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceFeed")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
