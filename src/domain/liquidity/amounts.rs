//! Closed-form token <-> liquidity relations over Q64.64 sqrt prices
//!
//! For a range `[sa, sb]` of sqrt prices:
//! - `amount_a = L * (sb - sa) / (sa * sb)`
//! - `amount_b = L * (sb - sa)`
//!
//! Intermediates are 256-bit. Results that do not fit the on-chain integer
//! widths fail with `MathOverflow` instead of saturating.

use ethnum::U256;

use crate::shared::errors::{ComposeResult, PositionError};

fn ordered(sqrt_price_0: u128, sqrt_price_1: u128) -> (u128, u128) {
    if sqrt_price_0 > sqrt_price_1 {
        (sqrt_price_1, sqrt_price_0)
    } else {
        (sqrt_price_0, sqrt_price_1)
    }
}

fn overflow(what: &str) -> PositionError {
    PositionError::MathOverflow(format!("{} exceeds integer bounds", what))
}

fn to_u64(value: U256, what: &str) -> ComposeResult<u64> {
    if value > U256::from(u64::MAX) {
        return Err(overflow(what));
    }
    Ok(value.as_u64())
}

fn to_u128(value: U256, what: &str) -> ComposeResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(overflow(what));
    }
    Ok(value.as_u128())
}

/// Token A owed for `liquidity` across the sqrt price interval
pub fn amount_a_delta(
    sqrt_price_0: u128,
    sqrt_price_1: u128,
    liquidity: u128,
    round_up: bool,
) -> ComposeResult<u64> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    if lower == 0 {
        return Err(PositionError::InvalidRange("sqrt price must be positive".to_string()));
    }
    let numerator = (U256::from(liquidity) << 64u32)
        .checked_mul(U256::from(upper - lower))
        .ok_or_else(|| overflow("token A numerator"))?;
    let denominator = U256::from(lower) * U256::from(upper);

    let quotient = numerator / denominator;
    let result = if round_up && numerator % denominator != U256::ZERO {
        quotient + U256::ONE
    } else {
        quotient
    };
    to_u64(result, "token A amount")
}

/// Token B owed for `liquidity` across the sqrt price interval
pub fn amount_b_delta(
    sqrt_price_0: u128,
    sqrt_price_1: u128,
    liquidity: u128,
    round_up: bool,
) -> ComposeResult<u64> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    let product = U256::from(liquidity) * U256::from(upper - lower);

    let quotient = product >> 64;
    let has_remainder = product & U256::from(u64::MAX) != U256::ZERO;
    let result = if round_up && has_remainder {
        quotient + U256::ONE
    } else {
        quotient
    };
    to_u64(result, "token B amount")
}

/// Liquidity bought by `amount` of token A across the interval
pub fn liquidity_from_amount_a(
    amount: u64,
    sqrt_price_0: u128,
    sqrt_price_1: u128,
) -> ComposeResult<u128> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    if lower == upper {
        return Err(PositionError::InvalidRange("empty sqrt price interval".to_string()));
    }
    let product = (U256::from(amount) * U256::from(lower))
        .checked_mul(U256::from(upper))
        .ok_or_else(|| overflow("token A liquidity numerator"))?;
    to_u128((product / U256::from(upper - lower)) >> 64, "liquidity")
}

/// Liquidity bought by `amount` of token B across the interval
pub fn liquidity_from_amount_b(
    amount: u64,
    sqrt_price_0: u128,
    sqrt_price_1: u128,
) -> ComposeResult<u128> {
    let (lower, upper) = ordered(sqrt_price_0, sqrt_price_1);
    if lower == upper {
        return Err(PositionError::InvalidRange("empty sqrt price interval".to_string()));
    }
    to_u128((U256::from(amount) << 64) / U256::from(upper - lower), "liquidity")
}

/// Token amounts represented by `liquidity` in `[sqrt_lower, sqrt_upper]` at `sqrt_current`
pub fn amounts_for_liquidity(
    sqrt_current: u128,
    sqrt_lower: u128,
    sqrt_upper: u128,
    liquidity: u128,
    round_up: bool,
) -> ComposeResult<(u64, u64)> {
    if sqrt_current <= sqrt_lower {
        Ok((amount_a_delta(sqrt_lower, sqrt_upper, liquidity, round_up)?, 0))
    } else if sqrt_current >= sqrt_upper {
        Ok((0, amount_b_delta(sqrt_lower, sqrt_upper, liquidity, round_up)?))
    } else {
        Ok((
            amount_a_delta(sqrt_current, sqrt_upper, liquidity, round_up)?,
            amount_b_delta(sqrt_lower, sqrt_current, liquidity, round_up)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tick::sqrt_price_from_tick_index;
    use proptest::prelude::*;

    const Q64: u128 = 1 << 64;

    #[test]
    fn test_amount_deltas_at_unit_price() {
        // [1, 4] in price, [1, 2] in sqrt price
        let amount_a = amount_a_delta(Q64, 2 * Q64, 1_000_000, false).unwrap();
        let amount_b = amount_b_delta(Q64, 2 * Q64, 1_000_000, false).unwrap();
        assert_eq!(amount_a, 500_000);
        assert_eq!(amount_b, 1_000_000);
    }

    #[test]
    fn test_round_up_adds_one_only_with_remainder() {
        let down = amount_a_delta(Q64, 3 * Q64, 1_000, false).unwrap();
        let up = amount_a_delta(Q64, 3 * Q64, 1_000, true).unwrap();
        assert_eq!(down, 666);
        assert_eq!(up, 667);
        assert_eq!(
            amount_b_delta(Q64, 2 * Q64, 1_000, true).unwrap(),
            amount_b_delta(Q64, 2 * Q64, 1_000, false).unwrap()
        );
    }

    #[test]
    fn test_argument_order_is_irrelevant() {
        assert_eq!(
            amount_a_delta(2 * Q64, Q64, 777, false).unwrap(),
            amount_a_delta(Q64, 2 * Q64, 777, false).unwrap()
        );
    }

    #[test]
    fn test_token_amount_overflow_is_reported() {
        let result = amount_b_delta(Q64, 2 * Q64, u128::MAX, false);
        assert!(matches!(result, Err(PositionError::MathOverflow(_))));
    }

    #[test]
    fn test_empty_interval_rejected() {
        assert!(matches!(
            liquidity_from_amount_b(100, Q64, Q64),
            Err(PositionError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_single_sided_amounts() {
        let lower = sqrt_price_from_tick_index(-64).unwrap();
        let upper = sqrt_price_from_tick_index(64).unwrap();
        let below = sqrt_price_from_tick_index(-128).unwrap();
        let above = sqrt_price_from_tick_index(128).unwrap();
        let (a, b) = amounts_for_liquidity(below, lower, upper, 1_000_000_000, false).unwrap();
        assert!(a > 0);
        assert_eq!(b, 0);
        let (a, b) = amounts_for_liquidity(above, lower, upper, 1_000_000_000, false).unwrap();
        assert_eq!(a, 0);
        assert!(b > 0);
    }

    proptest! {
        #[test]
        fn prop_liquidity_from_amount_never_exceeds_input(
            amount in 1_000u64..1_000_000_000_000,
            lower_tick in -50_000i32..50_000,
            width in 1i32..5_000,
        ) {
            let lower = sqrt_price_from_tick_index(lower_tick).unwrap();
            let upper = sqrt_price_from_tick_index(lower_tick + width).unwrap();

            let liquidity = liquidity_from_amount_a(amount, lower, upper).unwrap();
            prop_assert!(amount_a_delta(lower, upper, liquidity, false).unwrap() <= amount);

            let liquidity = liquidity_from_amount_b(amount, lower, upper).unwrap();
            prop_assert!(amount_b_delta(lower, upper, liquidity, false).unwrap() <= amount);
        }

        #[test]
        fn prop_round_up_is_at_most_one_more(
            liquidity in 1u128..1_000_000_000_000_000,
            lower_tick in -50_000i32..50_000,
            width in 1i32..5_000,
        ) {
            let lower = sqrt_price_from_tick_index(lower_tick).unwrap();
            let upper = sqrt_price_from_tick_index(lower_tick + width).unwrap();
            let down = amount_a_delta(lower, upper, liquidity, false).unwrap();
            let up = amount_a_delta(lower, upper, liquidity, true).unwrap();
            prop_assert!(up == down || up == down + 1);
        }
    }
}
