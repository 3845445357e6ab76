//! Liquidity distribution histogram for range visualization

pub mod aggregator;
pub mod synthetic;

pub use aggregator::*;
pub use synthetic::*;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::domain::tick::tick_to_price;
use crate::shared::types::{pubkey_string, PoolSnapshot, TokenSide};

/// Raw liquidity observed at one initialized tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSample {
    pub tick: i32,
    pub liquidity: u128,
    /// Pool price at the tick, token B per token A
    pub ratio_price: f64,
}

/// USD prices of both pool tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsdPrices {
    pub token_a: f64,
    pub token_b: f64,
}

impl UsdPrices {
    pub fn for_side(&self, side: TokenSide) -> f64 {
        match side {
            TokenSide::A => self.token_a,
            TokenSide::B => self.token_b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityBucket {
    pub price_start: f64,
    pub price_end: f64,
    pub liquidity: u128,
    /// Display height in [0, 1]; empty buckets are exactly 0
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SyntheticReason {
    SparseData { in_window_samples: usize },
    PeggedPair,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub display_token: TokenSide,
    pub current_usd_price: f64,
    pub window_low: f64,
    pub window_high: f64,
    pub buckets: Vec<LiquidityBucket>,
    pub is_synthetic: bool,
    pub synthetic_reason: Option<SyntheticReason>,
    pub in_window_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionSettings {
    pub window_fraction: f64,
    pub bucket_count: usize,
    pub min_samples: usize,
    pub min_height: f64,
    pub max_height: f64,
    /// Tick arrays fetched on each side of the current one
    pub tick_arrays_per_side: u8,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            window_fraction: 0.4,
            bucket_count: 64,
            min_samples: 20,
            min_height: 0.10,
            max_height: 0.95,
            tick_arrays_per_side: 3,
        }
    }
}

/// Two mints expected to trade near a fixed ratio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeggedPair {
    pub name: String,
    #[serde(with = "pubkey_string")]
    pub mint_a: Pubkey,
    #[serde(with = "pubkey_string")]
    pub mint_b: Pubkey,
}

impl PeggedPair {
    pub fn matches(&self, mint_a: &Pubkey, mint_b: &Pubkey) -> bool {
        (self.mint_a == *mint_a && self.mint_b == *mint_b)
            || (self.mint_a == *mint_b && self.mint_b == *mint_a)
    }
}

pub fn is_pegged(pairs: &[PeggedPair], mint_a: &Pubkey, mint_b: &Pubkey) -> bool {
    pairs.iter().any(|pair| pair.matches(mint_a, mint_b))
}

/// One initialized tick as stored in a tick array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializedTick {
    pub index: i32,
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
}

/// Raw samples for the aggregator, one per initialized tick carrying its gross liquidity
pub fn gross_liquidity_samples(pool: &PoolSnapshot, ticks: &[InitializedTick]) -> Vec<TickSample> {
    let mut sorted: Vec<InitializedTick> = ticks.to_vec();
    sorted.sort_by_key(|tick| tick.index);
    sorted.dedup_by_key(|tick| tick.index);

    let (decimals_a, decimals_b) = pool.decimals();
    sorted
        .into_iter()
        .map(|tick| TickSample {
            tick: tick.index,
            liquidity: tick.liquidity_gross,
            ratio_price: tick_to_price(tick.index, decimals_a, decimals_b),
        })
        .collect()
}
