//! Quote engine and the fixed-table rate source.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::RateEntry;
use crate::error::{ChainResult, ErrorKind};
use crate::quoting::types::SwapQuote;

/// Where exchange rates come from.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `to_token` bought by one unit of `from_token`.
    async fn rate(&self, from_token: &str, to_token: &str) -> ChainResult<Decimal>;

    fn name(&self) -> &'static str;
}

/// Rates from a configured table.
///
/// Identical tokens trade at 1; a pair missing from the table is served from
/// its inverse if that is configured.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<(String, String), Decimal>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((from.to_ascii_uppercase(), to.to_ascii_uppercase()), rate);
        self
    }

    pub fn from_entries(entries: &[RateEntry]) -> Self {
        entries
            .iter()
            .fold(Self::new(), |acc, e| acc.with_rate(&e.from, &e.to, e.rate))
    }
}

#[async_trait]
impl RateSource for FixedRates {
    async fn rate(&self, from_token: &str, to_token: &str) -> ChainResult<Decimal> {
        let from = from_token.to_ascii_uppercase();
        let to = to_token.to_ascii_uppercase();
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            return Ok(*rate);
        }
        if let Some(inverse) = self.rates.get(&(to.clone(), from.clone())) {
            return Decimal::ONE.checked_div(*inverse).ok_or_else(|| {
                ErrorKind::PricingUnavailable(format!("cannot invert rate {} for {}/{}", inverse, to, from))
            });
        }
        Err(ErrorKind::PricingUnavailable(format!("no rate configured for {}/{}", from, to)))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Engine for producing swap quotes.
#[derive(Clone)]
pub struct SwapQuoteEngine {
    source: Arc<dyn RateSource>,
}

impl SwapQuoteEngine {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    /// Quote `amount` of `from_token` in `to_token`.
    pub async fn quote(&self, from_token: &str, to_token: &str, amount: Decimal) -> ChainResult<SwapQuote> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ErrorKind::InvalidAmount(format!("{} is negative", amount)));
        }
        let rate = self.source.rate(from_token, to_token).await?;
        let quote = SwapQuote::new(from_token, to_token, amount, rate)?;

        tracing::info!(
            source = self.source.name(),
            from_token = quote.from_token(),
            to_token = quote.to_token(),
            from_amount = %quote.from_amount(),
            to_amount = %quote.to_amount(),
            rate = %quote.exchange_rate(),
            "Quote generated"
        );
        Ok(quote)
    }
}

impl std::fmt::Debug for SwapQuoteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapQuoteEngine")
            .field("source", &self.source.name())
            .finish()
    }
}
