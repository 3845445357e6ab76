//! Pool domain - fresh whirlpool state and tick liquidity

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey};

use crate::domain::distribution::TickSample;
use crate::shared::errors::PositionError;
use crate::shared::types::PoolSnapshot;

/// Read access to pool state on chain
///
/// Every call reads fresh state at the reader's commitment level.
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn pool_snapshot(&self, address: &Pubkey) -> Result<PoolSnapshot, PositionError>;

    /// Liquidity at initialized ticks in the tick arrays around the current one
    async fn tick_samples(
        &self,
        pool: &PoolSnapshot,
        arrays_per_side: u8,
    ) -> Result<Vec<TickSample>, PositionError>;

    async fn latest_blockhash(&self) -> Result<Hash, PositionError>;
}
