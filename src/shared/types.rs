//! Common types used across the engine

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::shared::errors::{ComposeResult, PositionError};

/// Which side of the pool a value refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSide {
    A,
    B,
}

impl TokenSide {
    pub fn other(self) -> Self {
        match self {
            TokenSide::A => TokenSide::B,
            TokenSide::B => TokenSide::A,
        }
    }
}

impl fmt::Display for TokenSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSide::A => write!(f, "A"),
            TokenSide::B => write!(f, "B"),
        }
    }
}

/// Token representation inside a pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenMeta {
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    #[serde(with = "pubkey_string")]
    pub vault: Pubkey,
    pub decimals: u8,
}

/// Read-only pool snapshot fetched per operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    pub token_a: TokenMeta,
    pub token_b: TokenMeta,
    pub tick_spacing: u16,
    /// Fee rate in hundredths of a basis point (3000 = 0.30%)
    pub fee_rate: u16,
    pub sqrt_price_x64: u128,
    pub tick_current_index: i32,
    pub liquidity: u128,
    /// Slot the snapshot was read at, 0 when unknown
    pub slot: u64,
}

impl PoolSnapshot {
    pub fn fee_rate_bps(&self) -> f64 {
        self.fee_rate as f64 / 100.0
    }

    pub fn decimals(&self) -> (u8, u8) {
        (self.token_a.decimals, self.token_b.decimals)
    }

    /// Current price of A in B, derived from the sqrt price
    pub fn current_price(&self) -> f64 {
        crate::domain::tick::sqrt_price_to_price(
            self.sqrt_price_x64,
            self.token_a.decimals,
            self.token_b.decimals,
        )
    }

    pub fn token(&self, side: TokenSide) -> &TokenMeta {
        match side {
            TokenSide::A => &self.token_a,
            TokenSide::B => &self.token_b,
        }
    }
}

/// On-chain position as read by a position source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    #[serde(with = "pubkey_string")]
    pub position_mint: Pubkey,
    #[serde(with = "pubkey_string")]
    pub whirlpool: Pubkey,
    #[serde(with = "pubkey_string")]
    pub owner: Pubkey,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub liquidity: u128,
    pub fee_owed_a: u64,
    pub fee_owed_b: u64,
    /// Slot the position was read at, 0 when unknown
    pub slot: u64,
}

impl Position {
    pub fn has_fees_owed(&self) -> bool {
        self.fee_owed_a > 0 || self.fee_owed_b > 0
    }

    pub fn is_empty(&self) -> bool {
        self.liquidity == 0
    }
}

/// Requested price bounds, quoted as token B per token A
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub lower_price: f64,
    pub upper_price: f64,
}

impl PriceRange {
    pub fn new(lower_price: f64, upper_price: f64) -> ComposeResult<Self> {
        for price in [lower_price, upper_price] {
            if !price.is_finite() || price <= 0.0 {
                return Err(PositionError::InvalidRange(format!(
                    "price bound must be positive and finite, got {}",
                    price
                )));
            }
        }
        if lower_price >= upper_price {
            return Err(PositionError::InvalidRange(format!(
                "lower price {} must be below upper price {}",
                lower_price, upper_price
            )));
        }
        Ok(Self { lower_price, upper_price })
    }

    /// Parse user supplied decimal strings
    pub fn parse(lower: &str, upper: &str) -> ComposeResult<Self> {
        let parse_bound = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| PositionError::InvalidRange(format!("'{}' is not a price", raw)))
        };
        Self::new(parse_bound(lower)?, parse_bound(upper)?)
    }
}

/// Convert a UI amount into base units, truncating any excess precision
pub fn to_base_units(amount: f64, decimals: u8) -> ComposeResult<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PositionError::InvalidAmount(format!(
            "amount must be positive and finite, got {}",
            amount
        )));
    }
    let exact = amount * 10_f64.powi(decimals as i32);
    // Snap values a few ulps below a whole unit before truncating
    let nearest = exact.round();
    let scaled = if (nearest - exact).abs() <= exact * 4.0 * f64::EPSILON {
        nearest
    } else {
        exact.floor()
    };
    if scaled >= u64::MAX as f64 {
        return Err(PositionError::MathOverflow(format!(
            "amount {} does not fit in base units",
            amount
        )));
    }
    Ok(scaled as u64)
}

/// Convert base units into a UI amount
pub fn from_base_units(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10_f64.powi(decimals as i32)
}

/// Serde helper storing pubkeys as base58 strings
pub mod pubkey_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_range_rejects_inverted_bounds() {
        assert!(matches!(
            PriceRange::new(132.0, 120.0),
            Err(PositionError::InvalidRange(_))
        ));
        assert!(matches!(
            PriceRange::new(0.0, 120.0),
            Err(PositionError::InvalidRange(_))
        ));
        assert!(matches!(
            PriceRange::new(f64::NAN, 120.0),
            Err(PositionError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_price_range_parse_is_format_insensitive() {
        let a = PriceRange::parse("120", "132").unwrap();
        let b = PriceRange::parse(" 120.0 ", "132.000").unwrap();
        assert_eq!(a, b);
        assert!(PriceRange::parse("abc", "132").is_err());
    }

    #[test]
    fn test_base_units_truncate() {
        assert_eq!(to_base_units(1.2345678, 6).unwrap(), 1_234_567);
        assert_eq!(to_base_units(10.0, 9).unwrap(), 10_000_000_000);
        assert!(matches!(to_base_units(-1.0, 6), Err(PositionError::InvalidAmount(_))));
        assert!(matches!(to_base_units(f64::INFINITY, 6), Err(PositionError::InvalidAmount(_))));
        assert_eq!(from_base_units(1_500_000, 6), 1.5);
    }

    #[test]
    fn test_base_units_keep_whole_decimal_inputs() {
        assert_eq!(to_base_units(1.001, 6).unwrap(), 1_001_000);
        for i in 1..=2000u64 {
            assert_eq!(to_base_units(i as f64 / 1000.0, 6).unwrap(), i * 1000, "{} thousandths", i);
        }
        assert_eq!(to_base_units(1.0000005, 6).unwrap(), 1_000_000);
    }

    #[test]
    fn test_token_side_other() {
        assert_eq!(TokenSide::A.other(), TokenSide::B);
        assert_eq!(TokenSide::B.to_string(), "B");
    }
}
