//! Conversion between human-scale decimal amounts and native integer units.
//!
//! Ethereum amounts are carried as wei (10^18 per ETH) in a `U256`; Solana
//! amounts as lamports (10^9 per SOL) in a `u64`. Conversions are exact for
//! decimals with at most that many fractional digits. Digits below one native
//! unit are truncated toward zero; anything that does not fit the target type
//! is an [`ErrorKind::AmountOverflow`], never a silent wrap.

use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::error::{ChainResult, ErrorKind};

/// Fractional digits of one ETH expressed in wei.
pub const WEI_DECIMALS: u32 = 18;

/// Fractional digits of one SOL expressed in lamports.
pub const LAMPORT_DECIMALS: u32 = 9;

/// Convert a whole-coin amount into native integer units with `decimals` places.
pub fn to_native_units(amount: Decimal, decimals: u32) -> ChainResult<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ErrorKind::InvalidAmount(format!(
            "{} is negative",
            amount
        )));
    }

    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scale = amount.scale();

    if scale <= decimals {
        let factor = pow10(decimals - scale);
        mantissa.checked_mul(factor).ok_or_else(|| {
            ErrorKind::AmountOverflow(format!("{} does not fit 256 bits of native units", amount))
        })
    } else {
        let divisor = pow10(scale - decimals);
        let native = mantissa / divisor;
        if native * divisor != mantissa {
            tracing::debug!(
                amount = %amount,
                decimals,
                "Dropping sub-unit dust during conversion"
            );
        }
        Ok(native)
    }
}

/// Convert native integer units with `decimals` places back to a whole-coin amount.
pub fn from_native_units(native: U256, decimals: u32) -> ChainResult<Decimal> {
    let value = u128::try_from(native).map_err(|_| {
        ErrorKind::AmountOverflow(format!("{} native units exceed decimal range", native))
    })?;
    let mut value = i128::try_from(value).map_err(|_| {
        ErrorKind::AmountOverflow(format!("{} native units exceed decimal range", native))
    })?;

    // Trailing zeros cost mantissa bits without adding precision.
    let mut scale = decimals;
    while scale > 0 && value != 0 && value % 10 == 0 {
        value /= 10;
        scale -= 1;
    }

    Decimal::try_from_i128_with_scale(value, scale)
        .map(|d| d.normalize())
        .map_err(|e| ErrorKind::AmountOverflow(format!("{} native units: {}", native, e)))
}

/// ETH → wei.
pub fn ether_to_wei(amount: Decimal) -> ChainResult<U256> {
    to_native_units(amount, WEI_DECIMALS)
}

/// wei → ETH.
pub fn wei_to_ether(wei: U256) -> ChainResult<Decimal> {
    from_native_units(wei, WEI_DECIMALS)
}

/// SOL → lamports.
pub fn sol_to_lamports(amount: Decimal) -> ChainResult<u64> {
    let native = to_native_units(amount, LAMPORT_DECIMALS)?;
    u64::try_from(native).map_err(|_| {
        ErrorKind::AmountOverflow(format!("{} SOL exceeds the u64 lamport range", amount))
    })
}

/// lamports → SOL.
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(lamports), LAMPORT_DECIMALS).normalize()
}

fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_one_ether_is_ten_to_the_eighteen_wei() {
        let wei = ether_to_wei(dec("1.0")).unwrap();
        assert_eq!(wei.to_string(), "1000000000000000000");
    }

    #[test]
    fn test_one_sol_is_ten_to_the_nine_lamports() {
        assert_eq!(sol_to_lamports(dec("1.0")).unwrap(), 1_000_000_000);
        assert_eq!(sol_to_lamports(dec("0.000000001")).unwrap(), 1);
    }

    #[test]
    fn test_sub_unit_dust_is_truncated() {
        assert_eq!(sol_to_lamports(dec("1.0000000019")).unwrap(), 1_000_000_001);
        assert_eq!(sol_to_lamports(dec("0.0000000009")).unwrap(), 0);
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(matches!(
            ether_to_wei(dec("-0.5")),
            Err(ErrorKind::InvalidAmount(_))
        ));
        assert!(matches!(
            sol_to_lamports(dec("-1")),
            Err(ErrorKind::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_lamport_overflow_rejected() {
        // u64::MAX lamports is ~18.4 billion SOL.
        let err = sol_to_lamports(dec("18446744074")).unwrap_err();
        assert!(matches!(err, ErrorKind::AmountOverflow(_)));
    }

    #[test]
    fn test_wei_beyond_decimal_range_rejected() {
        let err = wei_to_ether(U256::MAX).unwrap_err();
        assert!(matches!(err, ErrorKind::AmountOverflow(_)));
    }

    #[test]
    fn test_native_back_to_human() {
        assert_eq!(
            wei_to_ether(U256::from(1_500_000_000_000_000_000u128)).unwrap(),
            dec("1.5")
        );
        assert_eq!(lamports_to_sol(2_000_000_000), dec("2"));
        assert_eq!(lamports_to_sol(5_000), dec("0.000005"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// ETH → wei → ETH is exact for up to 18 fractional digits.
        #[test]
        fn ether_round_trip(units in 0u64..u64::MAX, scale in 0u32..=18) {
            let amount = Decimal::from_i128_with_scale(i128::from(units), scale);
            let wei = ether_to_wei(amount).unwrap();
            prop_assert_eq!(wei_to_ether(wei).unwrap(), amount);
        }

        /// SOL → lamports → SOL is exact for up to 9 fractional digits.
        #[test]
        fn sol_round_trip(lamports in 0u64..u64::MAX, scale in 0u32..=9) {
            let amount = Decimal::from_i128_with_scale(i128::from(lamports), 9)
                .round_dp(scale);
            if let Ok(native) = sol_to_lamports(amount) {
                prop_assert_eq!(lamports_to_sol(native), amount);
            }
        }

        /// Native → human → native never changes the integer amount.
        #[test]
        fn lamports_round_trip(lamports in any::<u64>()) {
            prop_assert_eq!(sol_to_lamports(lamports_to_sol(lamports)).unwrap(), lamports);
        }
    }
}
