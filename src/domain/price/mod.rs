//! Price domain - USD valuation of pool tokens

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::domain::distribution::UsdPrices;
use crate::shared::errors::PositionError;
use crate::shared::types::PoolSnapshot;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn usd_price(&self, mint: &Pubkey) -> Result<f64, PositionError>;

    async fn pool_prices(&self, pool: &PoolSnapshot) -> Result<UsdPrices, PositionError> {
        Ok(UsdPrices {
            token_a: self.usd_price(&pool.token_a.mint).await?,
            token_b: self.usd_price(&pool.token_b.mint).await?,
        })
    }
}
