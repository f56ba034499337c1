//! Quote types.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{ChainResult, ErrorKind};

/// An exchange quote: `from_amount` of `from_token` buys `to_amount` of
/// `to_token` at `exchange_rate`.
///
/// Immutable; `to_amount == from_amount * exchange_rate` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    from_token: String,
    to_token: String,
    from_amount: Decimal,
    to_amount: Decimal,
    exchange_rate: Decimal,
}

impl SwapQuote {
    /// Build a quote, computing `to_amount` from the rate.
    pub fn new(
        from_token: &str,
        to_token: &str,
        from_amount: Decimal,
        exchange_rate: Decimal,
    ) -> ChainResult<Self> {
        if from_amount.is_sign_negative() && !from_amount.is_zero() {
            return Err(ErrorKind::InvalidAmount(format!("{} is negative", from_amount)));
        }
        if exchange_rate <= Decimal::ZERO {
            return Err(ErrorKind::PricingUnavailable(format!(
                "non-positive rate {} for {}/{}",
                exchange_rate, from_token, to_token
            )));
        }
        let to_amount = from_amount.checked_mul(exchange_rate).ok_or_else(|| {
            ErrorKind::AmountOverflow(format!("{} × {} overflows", from_amount, exchange_rate))
        })?;

        Ok(Self {
            from_token: from_token.to_ascii_uppercase(),
            to_token: to_token.to_ascii_uppercase(),
            from_amount,
            to_amount,
            exchange_rate,
        })
    }

    pub fn from_token(&self) -> &str {
        &self.from_token
    }

    pub fn to_token(&self) -> &str {
        &self.to_token
    }

    pub fn from_amount(&self) -> Decimal {
        self.from_amount
    }

    pub fn to_amount(&self) -> Decimal {
        self.to_amount
    }

    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }
}
