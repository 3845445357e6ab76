//! USD prices from the `[prices]` config table

use std::collections::HashMap;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::domain::price::PriceOracle;
use crate::shared::errors::{AppError, PositionError};

#[derive(Debug, Clone, Default)]
pub struct StaticPriceOracle {
    prices: HashMap<Pubkey, f64>,
}

impl StaticPriceOracle {
    pub fn new(prices: HashMap<Pubkey, f64>) -> Self {
        Self { prices }
    }

    pub fn from_config(table: &HashMap<String, f64>) -> Result<Self, AppError> {
        let mut prices = HashMap::with_capacity(table.len());
        for (mint, price) in table {
            let mint: Pubkey = mint
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid mint in [prices] {}: {}", mint, e)))?;
            prices.insert(mint, *price);
        }
        Ok(Self { prices })
    }

    pub fn with_price(mut self, mint: Pubkey, price: f64) -> Self {
        self.prices.insert(mint, price);
        self
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn usd_price(&self, mint: &Pubkey) -> Result<f64, PositionError> {
        self.prices
            .get(mint)
            .copied()
            .ok_or_else(|| PositionError::InvalidAmount(format!("no USD price configured for {}", mint)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::sample_pool;

    #[tokio::test]
    async fn test_pool_prices() {
        let pool = sample_pool(126.0);
        let oracle = StaticPriceOracle::default()
            .with_price(pool.token_a.mint, 126.0)
            .with_price(pool.token_b.mint, 1.0);
        let prices = oracle.pool_prices(&pool).await.unwrap();
        assert_eq!(prices.token_a, 126.0);
        assert_eq!(prices.token_b, 1.0);

        let missing = StaticPriceOracle::default();
        assert!(matches!(missing.pool_prices(&pool).await, Err(PositionError::InvalidAmount(_))));
    }

    #[test]
    fn test_from_config() {
        let mut table = HashMap::new();
        table.insert("So11111111111111111111111111111111111111112".to_string(), 126.0);
        assert!(StaticPriceOracle::from_config(&table).is_ok());
        table.insert("bad".to_string(), 1.0);
        assert!(StaticPriceOracle::from_config(&table).is_err());
    }
}
