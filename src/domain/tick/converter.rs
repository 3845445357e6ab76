//! Human price <-> tick conversion and tick-spacing alignment
//!
//! Prices are quoted as token B per token A in UI units, related to ticks by
//! `price = 1.0001^tick * 10^(decimals_a - decimals_b)`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tick_math::{max_usable_tick, min_usable_tick, MAX_TICK_INDEX, MIN_TICK_INDEX};
use crate::shared::errors::{ComposeResult, PositionError};
use crate::shared::types::PriceRange;

/// Per-tick price growth factor
pub const TICK_BASE: f64 = 1.0001;

// Raw ticks this close to an integer are treated as sitting on that boundary
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Which end of a range a tick is being aligned for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Lower,
    Upper,
}

/// Realized tick bounds of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl TickRange {
    pub fn new(tick_lower: i32, tick_upper: i32, tick_spacing: u16) -> ComposeResult<Self> {
        let spacing = tick_spacing as i32;
        if spacing == 0 {
            return Err(PositionError::InvalidRange("tick spacing must be positive".to_string()));
        }
        if tick_lower % spacing != 0 || tick_upper % spacing != 0 {
            return Err(PositionError::InvalidRange(format!(
                "ticks [{}, {}] are not multiples of spacing {}",
                tick_lower, tick_upper, spacing
            )));
        }
        if tick_lower >= tick_upper {
            return Err(PositionError::InvalidRange(format!(
                "tick lower {} must be below tick upper {}",
                tick_lower, tick_upper
            )));
        }
        if tick_lower < min_usable_tick(tick_spacing) || tick_upper > max_usable_tick(tick_spacing) {
            return Err(PositionError::InvalidRange(format!(
                "ticks [{}, {}] outside the usable range",
                tick_lower, tick_upper
            )));
        }
        Ok(Self { tick_lower, tick_upper })
    }

    pub fn contains(&self, tick: i32) -> bool {
        self.tick_lower <= tick && tick < self.tick_upper
    }
}

fn decimal_shift(decimals_a: u8, decimals_b: u8) -> f64 {
    10f64.powi(decimals_a as i32 - decimals_b as i32)
}

fn raw_tick(price: f64, decimals_a: u8, decimals_b: u8) -> ComposeResult<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(PositionError::InvalidRange(format!(
            "price must be positive and finite, got {}",
            price
        )));
    }
    let raw = (price / decimal_shift(decimals_a, decimals_b)).ln() / TICK_BASE.ln();
    let nearest = raw.round();
    Ok(if (raw - nearest).abs() < BOUNDARY_EPSILON { nearest } else { raw })
}

fn checked_tick(raw: f64) -> ComposeResult<i32> {
    if raw < MIN_TICK_INDEX as f64 || raw > MAX_TICK_INDEX as f64 {
        return Err(PositionError::InvalidRange(format!(
            "price maps to tick {:.0}, outside [{}, {}]",
            raw, MIN_TICK_INDEX, MAX_TICK_INDEX
        )));
    }
    Ok(raw as i32)
}

/// Greatest tick whose price does not exceed `price`
pub fn price_to_tick(price: f64, decimals_a: u8, decimals_b: u8) -> ComposeResult<i32> {
    checked_tick(raw_tick(price, decimals_a, decimals_b)?.floor())
}

pub fn tick_to_price(tick: i32, decimals_a: u8, decimals_b: u8) -> f64 {
    TICK_BASE.powf(tick as f64) * decimal_shift(decimals_a, decimals_b)
}

/// Align a tick to the spacing grid without narrowing the range it bounds
pub fn align_tick(tick: i32, tick_spacing: u16, bound: RangeBound) -> i32 {
    let spacing = tick_spacing.max(1) as i32;
    let down = tick.div_euclid(spacing) * spacing;
    match bound {
        RangeBound::Lower => down,
        RangeBound::Upper if down == tick => tick,
        RangeBound::Upper => down + spacing,
    }
}

/// Aligned tick for one end of a requested range
pub fn price_to_aligned_tick(
    price: f64,
    decimals_a: u8,
    decimals_b: u8,
    tick_spacing: u16,
    bound: RangeBound,
) -> ComposeResult<i32> {
    if tick_spacing == 0 {
        return Err(PositionError::InvalidRange("tick spacing must be positive".to_string()));
    }
    let raw = raw_tick(price, decimals_a, decimals_b)?;
    let tick = match bound {
        RangeBound::Lower => checked_tick(raw.floor())?,
        RangeBound::Upper => checked_tick(raw.ceil())?,
    };
    let aligned = align_tick(tick, tick_spacing, bound);
    if aligned < min_usable_tick(tick_spacing) || aligned > max_usable_tick(tick_spacing) {
        return Err(PositionError::InvalidRange(format!(
            "price {} aligns to tick {} outside the usable range",
            price, aligned
        )));
    }
    Ok(aligned)
}

/// Resolve a requested price range into spacing-aligned ticks
pub fn resolve_tick_range(
    range: &PriceRange,
    decimals_a: u8,
    decimals_b: u8,
    tick_spacing: u16,
) -> ComposeResult<TickRange> {
    if tick_spacing == 0 {
        return Err(PositionError::InvalidRange("tick spacing must be positive".to_string()));
    }
    let tick_lower = price_to_aligned_tick(
        range.lower_price,
        decimals_a,
        decimals_b,
        tick_spacing,
        RangeBound::Lower,
    )?;
    let tick_upper = price_to_aligned_tick(
        range.upper_price,
        decimals_a,
        decimals_b,
        tick_spacing,
        RangeBound::Upper,
    )?;
    debug!(
        "Resolved range {}-{} to ticks [{}, {}] (spacing {})",
        range.lower_price, range.upper_price, tick_lower, tick_upper, tick_spacing
    );
    TickRange::new(tick_lower, tick_upper, tick_spacing)
}
