//! Position resolution, sources and valuation

pub mod resolver;
pub mod source;

pub use resolver::*;
pub use source::*;

use serde::{Deserialize, Serialize};

use crate::domain::liquidity::amounts_for_liquidity;
use crate::domain::tick::sqrt_price_from_tick_index;
use crate::shared::errors::ComposeResult;
use crate::shared::types::{PoolSnapshot, Position};

/// Current price relative to a position's range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    PriceBelowRange,
    PriceInRange,
    PriceAboveRange,
}

pub fn position_status(pool: &PoolSnapshot, position: &Position) -> PositionStatus {
    if pool.tick_current_index < position.tick_lower_index {
        PositionStatus::PriceBelowRange
    } else if pool.tick_current_index < position.tick_upper_index {
        PositionStatus::PriceInRange
    } else {
        PositionStatus::PriceAboveRange
    }
}

/// Token amounts the position's liquidity represents at the current price
pub fn position_amounts(pool: &PoolSnapshot, position: &Position) -> ComposeResult<(u64, u64)> {
    amounts_for_liquidity(
        pool.sqrt_price_x64,
        sqrt_price_from_tick_index(position.tick_lower_index)?,
        sqrt_price_from_tick_index(position.tick_upper_index)?,
        position.liquidity,
        false,
    )
}
