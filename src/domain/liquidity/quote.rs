//! Deposit and withdraw quoting with slippage protection

use ethnum::U256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::amounts::{
    amounts_for_liquidity, liquidity_from_amount_a, liquidity_from_amount_b,
};
use crate::domain::tick::{
    resolve_tick_range, sqrt_price_from_tick_index, TickRange, MAX_SQRT_PRICE_X64,
    MIN_SQRT_PRICE_X64,
};
use crate::shared::errors::{ComposeResult, PositionError};
use crate::shared::types::{from_base_units, PoolSnapshot, Position, PriceRange, TokenSide};

pub const MAX_SLIPPAGE_BPS: u16 = 10_000;

/// Where the current price sits relative to a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePlacement {
    /// Range lies above the current price, only token A is deposited
    AboveCurrentPrice,
    /// Current price is inside the range, both tokens are deposited
    InRange,
    /// Range lies below the current price, only token B is deposited
    BelowCurrentPrice,
}

/// Result of quoting a deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityQuote {
    pub liquidity: u128,
    pub tick_range: TickRange,
    pub placement: RangePlacement,
    pub token_est_a: u64,
    pub token_est_b: u64,
    /// Lowest amounts the deposit can settle at within the slippage band
    pub token_min_a: u64,
    pub token_min_b: u64,
    /// Most the program may pull from the wallet within the slippage band
    pub token_max_a: u64,
    pub token_max_b: u64,
    pub slippage_bps: u16,
    /// Share of deposited value in each token, summing to 100
    pub ratio_a: u8,
    pub ratio_b: u8,
}

/// Result of quoting a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawQuote {
    pub liquidity: u128,
    pub token_est_a: u64,
    pub token_est_b: u64,
    pub token_min_a: u64,
    pub token_min_b: u64,
    pub slippage_bps: u16,
}

pub fn validate_slippage(slippage_bps: u16) -> ComposeResult<()> {
    if slippage_bps > MAX_SLIPPAGE_BPS {
        return Err(PositionError::InvalidAmount(format!(
            "slippage {} bps exceeds {} bps",
            slippage_bps, MAX_SLIPPAGE_BPS
        )));
    }
    Ok(())
}

fn scale_x64(sqrt_price_x64: u128, factor_x64: u128, round_up: bool) -> u128 {
    let product = U256::from(sqrt_price_x64) * U256::from(factor_x64);
    let mut scaled = product >> 64u32;
    if round_up && product & U256::from(u64::MAX) != U256::ZERO {
        scaled += U256::ONE;
    }
    if scaled > U256::from(MAX_SQRT_PRICE_X64) {
        MAX_SQRT_PRICE_X64
    } else {
        scaled.as_u128().max(MIN_SQRT_PRICE_X64)
    }
}

/// Sqrt prices at the edges of the slippage band around `sqrt_price_x64`
///
/// A price move of `bps` moves the sqrt price by `sqrt(1 +- bps/10000)`.
pub fn slippage_sqrt_price_bounds(sqrt_price_x64: u128, slippage_bps: u16) -> (u128, u128) {
    let fraction = slippage_bps.min(MAX_SLIPPAGE_BPS) as f64 / MAX_SLIPPAGE_BPS as f64;
    let q64 = 2f64.powi(64);
    let lower_factor = ((1.0 - fraction).sqrt() * q64).floor() as u128;
    let upper_factor = ((1.0 + fraction).sqrt() * q64).ceil() as u128;
    (
        scale_x64(sqrt_price_x64, lower_factor, false),
        scale_x64(sqrt_price_x64, upper_factor, true),
    )
}

pub fn range_placement(sqrt_current: u128, sqrt_lower: u128, sqrt_upper: u128) -> RangePlacement {
    if sqrt_current <= sqrt_lower {
        RangePlacement::AboveCurrentPrice
    } else if sqrt_current >= sqrt_upper {
        RangePlacement::BelowCurrentPrice
    } else {
        RangePlacement::InRange
    }
}

fn value_ratios(pool: &PoolSnapshot, amount_a: u64, amount_b: u64, placement: RangePlacement) -> (u8, u8) {
    let value_a = from_base_units(amount_a, pool.token_a.decimals) * pool.current_price();
    let value_b = from_base_units(amount_b, pool.token_b.decimals);
    let total = value_a + value_b;
    if !total.is_finite() || total <= 0.0 {
        return match placement {
            RangePlacement::BelowCurrentPrice => (0, 100),
            _ => (100, 0),
        };
    }
    let ratio_a = ((value_a / total) * 100.0).round().clamp(0.0, 100.0) as u8;
    (ratio_a, 100 - ratio_a)
}

/// Quote a deposit of `amount` base units of `input` into `tick_range`
pub fn quote_deposit(
    pool: &PoolSnapshot,
    tick_range: TickRange,
    input: TokenSide,
    amount: u64,
    slippage_bps: u16,
) -> ComposeResult<LiquidityQuote> {
    validate_slippage(slippage_bps)?;
    if amount == 0 {
        return Err(PositionError::InvalidAmount("deposit amount must be positive".to_string()));
    }

    let sqrt_lower = sqrt_price_from_tick_index(tick_range.tick_lower)?;
    let sqrt_upper = sqrt_price_from_tick_index(tick_range.tick_upper)?;
    let sqrt_current = pool.sqrt_price_x64;
    let placement = range_placement(sqrt_current, sqrt_lower, sqrt_upper);

    let liquidity = match (placement, input) {
        (RangePlacement::AboveCurrentPrice, TokenSide::A) => {
            liquidity_from_amount_a(amount, sqrt_lower, sqrt_upper)?
        }
        (RangePlacement::BelowCurrentPrice, TokenSide::B) => {
            liquidity_from_amount_b(amount, sqrt_lower, sqrt_upper)?
        }
        (RangePlacement::InRange, TokenSide::A) => {
            liquidity_from_amount_a(amount, sqrt_current, sqrt_upper)?
        }
        (RangePlacement::InRange, TokenSide::B) => {
            liquidity_from_amount_b(amount, sqrt_lower, sqrt_current)?
        }
        (RangePlacement::AboveCurrentPrice, TokenSide::B) => {
            return Err(PositionError::InvalidAmount(
                "range lies above the current price and only accepts token A".to_string(),
            ))
        }
        (RangePlacement::BelowCurrentPrice, TokenSide::A) => {
            return Err(PositionError::InvalidAmount(
                "range lies below the current price and only accepts token B".to_string(),
            ))
        }
    };
    if liquidity == 0 {
        return Err(PositionError::InvalidAmount(format!(
            "amount {} of token {} is too small to mint liquidity",
            amount, input
        )));
    }

    let (token_est_a, token_est_b) =
        amounts_for_liquidity(sqrt_current, sqrt_lower, sqrt_upper, liquidity, false)?;

    let (sqrt_low, sqrt_high) = slippage_sqrt_price_bounds(sqrt_current, slippage_bps);
    let (min_a_low, min_b_low) = amounts_for_liquidity(sqrt_low, sqrt_lower, sqrt_upper, liquidity, false)?;
    let (min_a_high, min_b_high) = amounts_for_liquidity(sqrt_high, sqrt_lower, sqrt_upper, liquidity, false)?;
    let (max_a_low, max_b_low) = amounts_for_liquidity(sqrt_low, sqrt_lower, sqrt_upper, liquidity, true)?;
    let (max_a_high, max_b_high) = amounts_for_liquidity(sqrt_high, sqrt_lower, sqrt_upper, liquidity, true)?;

    let (ratio_a, ratio_b) = value_ratios(pool, token_est_a, token_est_b, placement);

    let quote = LiquidityQuote {
        liquidity,
        tick_range,
        placement,
        token_est_a,
        token_est_b,
        token_min_a: min_a_low.min(min_a_high),
        token_min_b: min_b_low.min(min_b_high),
        token_max_a: max_a_low.max(max_a_high),
        token_max_b: max_b_low.max(max_b_high),
        slippage_bps,
        ratio_a,
        ratio_b,
    };
    debug!(
        "Deposit quote: L={} est A={} B={} ratio {}/{} ({:?})",
        quote.liquidity, quote.token_est_a, quote.token_est_b, quote.ratio_a, quote.ratio_b, placement
    );
    Ok(quote)
}

/// Resolve `range` against the pool and quote the deposit
pub fn quote_deposit_for_range(
    pool: &PoolSnapshot,
    range: &PriceRange,
    input: TokenSide,
    amount: u64,
    slippage_bps: u16,
) -> ComposeResult<LiquidityQuote> {
    let tick_range = resolve_tick_range(
        range,
        pool.token_a.decimals,
        pool.token_b.decimals,
        pool.tick_spacing,
    )?;
    quote_deposit(pool, tick_range, input, amount, slippage_bps)
}

fn discount(amount: u64, slippage_bps: u16) -> u64 {
    let kept = (MAX_SLIPPAGE_BPS - slippage_bps.min(MAX_SLIPPAGE_BPS)) as u128;
    ((amount as u128 * kept) / MAX_SLIPPAGE_BPS as u128) as u64
}

/// Quote removing `liquidity_to_remove` from `position` at the current price
pub fn quote_withdraw(
    pool: &PoolSnapshot,
    position: &Position,
    liquidity_to_remove: u128,
    slippage_bps: u16,
) -> ComposeResult<WithdrawQuote> {
    validate_slippage(slippage_bps)?;
    if liquidity_to_remove == 0 {
        return Err(PositionError::InvalidAmount("liquidity to remove must be positive".to_string()));
    }
    if liquidity_to_remove > position.liquidity {
        return Err(PositionError::InsufficientLiquidity {
            requested: liquidity_to_remove,
            available: position.liquidity,
        });
    }

    let sqrt_lower = sqrt_price_from_tick_index(position.tick_lower_index)?;
    let sqrt_upper = sqrt_price_from_tick_index(position.tick_upper_index)?;
    let (token_est_a, token_est_b) = amounts_for_liquidity(
        pool.sqrt_price_x64,
        sqrt_lower,
        sqrt_upper,
        liquidity_to_remove,
        false,
    )?;

    Ok(WithdrawQuote {
        liquidity: liquidity_to_remove,
        token_est_a,
        token_est_b,
        token_min_a: discount(token_est_a, slippage_bps),
        token_min_b: discount(token_est_b, slippage_bps),
        slippage_bps,
    })
}

/// Liquidity to remove for a percentage withdrawal, 100 maps to the exact balance
pub fn liquidity_for_percentage(position: &Position, percentage: f64) -> ComposeResult<u128> {
    if !percentage.is_finite() || percentage <= 0.0 || percentage > 100.0 {
        return Err(PositionError::InvalidAmount(format!(
            "withdraw percentage must be in (0, 100], got {}",
            percentage
        )));
    }
    if percentage == 100.0 {
        return Ok(position.liquidity);
    }
    // Basis-point resolution keeps the arithmetic integral
    let bps = (percentage * 100.0).floor() as u128;
    let liquidity = U256::from(position.liquidity) * U256::from(bps) / U256::from(10_000u128);
    Ok(liquidity.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{sample_pool, sample_position};
    use crate::domain::tick::resolve_tick_range;
    use proptest::prelude::*;

    fn ticks(pool: &PoolSnapshot, lower: f64, upper: f64) -> TickRange {
        let range = PriceRange::new(lower, upper).unwrap();
        resolve_tick_range(&range, 9, 6, pool.tick_spacing).unwrap()
    }

    #[test]
    fn test_scenario_a_mixed_deposit() {
        let pool = sample_pool(126.0);
        let range = PriceRange::new(120.0, 132.0).unwrap();
        let quote = quote_deposit_for_range(&pool, &range, TokenSide::A, 10_000_000_000, 50).unwrap();

        assert_eq!(quote.placement, RangePlacement::InRange);
        assert!(quote.liquidity > 0);
        assert!(quote.token_est_b > 0);
        assert_eq!(quote.ratio_a as u16 + quote.ratio_b as u16, 100);
        assert!(quote.token_est_a <= 10_000_000_000);
        assert!(quote.token_min_a <= quote.token_est_a);
        assert!(quote.token_min_b <= quote.token_est_b);
        assert!(quote.token_max_a >= quote.token_est_a);
        assert!(quote.token_max_b >= quote.token_est_b);
    }

    #[test]
    fn test_scenario_b_range_above_price_is_token_a_only() {
        let pool = sample_pool(126.0);
        let range = PriceRange::new(140.0, 150.0).unwrap();
        let quote = quote_deposit_for_range(&pool, &range, TokenSide::A, 10_000_000_000, 50).unwrap();

        assert_eq!(quote.placement, RangePlacement::AboveCurrentPrice);
        assert_eq!(quote.token_est_b, 0);
        assert_eq!(quote.token_min_b, 0);
        assert_eq!((quote.ratio_a, quote.ratio_b), (100, 0));
    }

    #[test]
    fn test_single_sided_range_rejects_wrong_token() {
        let pool = sample_pool(126.0);
        let above = ticks(&pool, 140.0, 150.0);
        let below = ticks(&pool, 100.0, 110.0);
        assert!(matches!(
            quote_deposit(&pool, above, TokenSide::B, 1_000_000, 50),
            Err(PositionError::InvalidAmount(_))
        ));
        assert!(matches!(
            quote_deposit(&pool, below, TokenSide::A, 1_000_000, 50),
            Err(PositionError::InvalidAmount(_))
        ));
        let quote = quote_deposit(&pool, below, TokenSide::B, 1_000_000, 50).unwrap();
        assert_eq!(quote.token_est_a, 0);
        assert_eq!(quote.placement, RangePlacement::BelowCurrentPrice);
    }

    #[test]
    fn test_invalid_inputs() {
        let pool = sample_pool(126.0);
        let range = ticks(&pool, 120.0, 132.0);
        assert!(matches!(
            quote_deposit(&pool, range, TokenSide::A, 0, 50),
            Err(PositionError::InvalidAmount(_))
        ));
        assert!(matches!(
            quote_deposit(&pool, range, TokenSide::A, 1_000, 10_001),
            Err(PositionError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_slippage_bounds_bracket_current_price() {
        let pool = sample_pool(126.0);
        let (low, high) = slippage_sqrt_price_bounds(pool.sqrt_price_x64, 100);
        assert!(low < pool.sqrt_price_x64 && pool.sqrt_price_x64 < high);
        let (same_low, same_high) = slippage_sqrt_price_bounds(pool.sqrt_price_x64, 0);
        assert_eq!(same_low, pool.sqrt_price_x64);
        assert_eq!(same_high, pool.sqrt_price_x64);
    }

    #[test]
    fn test_withdraw_rejects_excess_liquidity() {
        let pool = sample_pool(126.0);
        let position = sample_position(&pool, 120.0, 132.0, 5_000);
        let err = quote_withdraw(&pool, &position, 5_001, 50).unwrap_err();
        assert_eq!(
            err,
            PositionError::InsufficientLiquidity { requested: 5_001, available: 5_000 }
        );
    }

    #[test]
    fn test_withdraw_minimums_discounted() {
        let pool = sample_pool(126.0);
        let position = sample_position(&pool, 120.0, 132.0, 50_000_000_000);
        let quote = quote_withdraw(&pool, &position, position.liquidity, 100).unwrap();
        assert!(quote.token_est_a > 0 && quote.token_est_b > 0);
        assert_eq!(quote.token_min_a, quote.token_est_a * 9_900 / 10_000);
        assert_eq!(quote.token_min_b, quote.token_est_b * 9_900 / 10_000);
    }

    #[test]
    fn test_full_percentage_is_exact_balance() {
        let pool = sample_pool(126.0);
        let position = sample_position(&pool, 120.0, 132.0, 123_456_789);
        assert_eq!(liquidity_for_percentage(&position, 100.0).unwrap(), 123_456_789);
        assert_eq!(liquidity_for_percentage(&position, 50.0).unwrap(), 61_728_394);
        assert!(liquidity_for_percentage(&position, 0.0).is_err());
        assert!(liquidity_for_percentage(&position, 100.5).is_err());
    }

    proptest! {
        #[test]
        fn prop_single_sided_quotes_zero_the_other_token(
            amount in 1_000_000u64..1_000_000_000_000,
            offset in 1.01f64..1.5,
            width in 1.01f64..1.5,
        ) {
            let pool = sample_pool(126.0);

            let above = ticks(&pool, 126.0 * offset, 126.0 * offset * width);
            let quote = quote_deposit(&pool, above, TokenSide::A, amount, 50).unwrap();
            prop_assert_eq!(quote.token_est_b, 0);

            let below = ticks(&pool, 126.0 / (offset * width), 126.0 / offset);
            let quote = quote_deposit(&pool, below, TokenSide::B, amount, 50).unwrap();
            prop_assert_eq!(quote.token_est_a, 0);
        }

        #[test]
        fn prop_minimums_never_exceed_estimates(
            amount in 1_000_000u64..100_000_000_000,
            slippage in 0u16..2_000,
            input_a in any::<bool>(),
        ) {
            let pool = sample_pool(126.0);
            let range = ticks(&pool, 110.0, 140.0);
            let input = if input_a { TokenSide::A } else { TokenSide::B };
            let quote = quote_deposit(&pool, range, input, amount, slippage).unwrap();
            prop_assert!(quote.token_min_a <= quote.token_est_a);
            prop_assert!(quote.token_min_b <= quote.token_est_b);
            prop_assert!(quote.token_max_a >= quote.token_est_a);
            prop_assert!(quote.token_max_b >= quote.token_est_b);
        }
    }
}
