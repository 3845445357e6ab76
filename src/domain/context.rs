//! Engine-wide settings passed explicitly into every compose call

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

use crate::domain::distribution::{is_pegged, DistributionSettings, PeggedPair};
use crate::domain::execution::WHIRLPOOL_PROGRAM_ID;
use crate::shared::types::PoolSnapshot;

pub const SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");
pub const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const USDT_MINT: Pubkey = pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8En2vBY");
pub const JUPSOL_MINT: Pubkey = pubkey!("jupSoLaHXQiZZTSfEWMTRRgpnyFm8f6sZdosWBjx93v");
pub const MSOL_MINT: Pubkey = pubkey!("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So");
pub const JITOSOL_MINT: Pubkey = pubkey!("J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn");

pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;
pub const DEFAULT_MAX_SNAPSHOT_LAG_SLOTS: u64 = 150;

pub fn default_pegged_pairs() -> Vec<PeggedPair> {
    [
        ("jupSOL/SOL", JUPSOL_MINT, SOL_MINT),
        ("mSOL/SOL", MSOL_MINT, SOL_MINT),
        ("JitoSOL/SOL", JITOSOL_MINT, SOL_MINT),
        ("USDC/USDT", USDC_MINT, USDT_MINT),
    ]
    .into_iter()
    .map(|(name, mint_a, mint_b)| PeggedPair {
        name: name.to_string(),
        mint_a,
        mint_b,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineContext {
    pub program_id: Pubkey,
    pub default_slippage_bps: u16,
    /// Maximum slot distance between a pool snapshot and a position read; 0 disables the check
    pub max_snapshot_lag_slots: u64,
    pub distribution: DistributionSettings,
    pub pegged_pairs: Vec<PeggedPair>,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            program_id: WHIRLPOOL_PROGRAM_ID,
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            max_snapshot_lag_slots: DEFAULT_MAX_SNAPSHOT_LAG_SLOTS,
            distribution: DistributionSettings::default(),
            pegged_pairs: default_pegged_pairs(),
        }
    }
}

impl EngineContext {
    pub fn is_pegged(&self, pool: &PoolSnapshot) -> bool {
        is_pegged(&self.pegged_pairs, &pool.token_a.mint, &pool.token_b.mint)
    }

    pub fn slippage_or_default(&self, slippage_bps: Option<u16>) -> u16 {
        slippage_bps.unwrap_or(self.default_slippage_bps)
    }
}
