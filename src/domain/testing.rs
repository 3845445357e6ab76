//! Fixtures shared by the domain tests

use solana_sdk::pubkey::Pubkey;

use crate::domain::tick::{price_to_sqrt_price, resolve_tick_range, tick_index_from_sqrt_price};
use crate::shared::types::{PoolSnapshot, Position, PriceRange, TokenMeta};

pub const SOL_DECIMALS: u8 = 9;
pub const USDC_DECIMALS: u8 = 6;

/// SOL/USDC style pool (9/6 decimals, spacing 64) at `price`
pub fn sample_pool(price: f64) -> PoolSnapshot {
    let sqrt_price_x64 = price_to_sqrt_price(price, SOL_DECIMALS, USDC_DECIMALS).unwrap();
    PoolSnapshot {
        address: Pubkey::new_from_array([7; 32]),
        token_a: TokenMeta {
            mint: Pubkey::new_from_array([1; 32]),
            vault: Pubkey::new_from_array([11; 32]),
            decimals: SOL_DECIMALS,
        },
        token_b: TokenMeta {
            mint: Pubkey::new_from_array([2; 32]),
            vault: Pubkey::new_from_array([12; 32]),
            decimals: USDC_DECIMALS,
        },
        tick_spacing: 64,
        fee_rate: 3000,
        sqrt_price_x64,
        tick_current_index: tick_index_from_sqrt_price(sqrt_price_x64).unwrap(),
        liquidity: 1_000_000_000_000,
        slot: 1_000,
    }
}

pub fn wallet() -> Pubkey {
    Pubkey::new_from_array([42; 32])
}

/// Position owned by `wallet()` over the aligned ticks of `[lower, upper]`
pub fn sample_position(pool: &PoolSnapshot, lower: f64, upper: f64, liquidity: u128) -> Position {
    let range = PriceRange::new(lower, upper).unwrap();
    let ticks = resolve_tick_range(&range, SOL_DECIMALS, USDC_DECIMALS, pool.tick_spacing).unwrap();
    let mint = Pubkey::new_unique();
    Position {
        address: crate::domain::execution::position_address(&crate::domain::execution::WHIRLPOOL_PROGRAM_ID, &mint).0,
        position_mint: mint,
        whirlpool: pool.address,
        owner: wallet(),
        tick_lower_index: ticks.tick_lower,
        tick_upper_index: ticks.tick_upper,
        liquidity,
        fee_owed_a: 0,
        fee_owed_b: 0,
        slot: pool.slot,
    }
}
