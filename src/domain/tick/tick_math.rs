//! Q64.64 sqrt-price <-> tick index conversion for Whirlpool pools
//!
//! Sqrt prices are `sqrt(1.0001^tick) * 2^64`. Conversions are exact integer math
//! and agree with the on-chain program bit for bit.

use ethnum::U256;

use crate::shared::errors::{ComposeResult, PositionError};

pub const MIN_TICK_INDEX: i32 = -443636;
pub const MAX_TICK_INDEX: i32 = 443636;
pub const MIN_SQRT_PRICE_X64: u128 = 4295048016;
pub const MAX_SQRT_PRICE_X64: u128 = 79226673515401279992447579055;

/// Number of ticks stored in one tick array account
pub const TICK_ARRAY_SIZE: i32 = 88;

const BIT_PRECISION: u32 = 14;
// log_2(sqrt(1.0001)) inverse in Q32.32
const LOG_B_2_X32: i128 = 59543866431248;
const LOG_B_P_ERR_MARGIN_LOWER_X64: i128 = 184467440737095516;
const LOG_B_P_ERR_MARGIN_UPPER_X64: i128 = 15793534762490258745;

// sqrt(1.0001)^(2^i) in Q32.96, bit 0 is the starting ratio for odd ticks
const POSITIVE_RATIOS_X96: [u128; 18] = [
    79236085330515764027303304731,
    79244008939048815603706035061,
    79259858533276714757314932305,
    79291567232598584799939703904,
    79355022692464371645785046466,
    79482085999252804386437311141,
    79736823300114093921829183326,
    80248749790819932309965073892,
    81282483887344747381513967011,
    83390072131320151908154831281,
    87770609709833776024991924138,
    97234110755111693312479820773,
    119332217159966728226237229890,
    179736315981702064433883588727,
    407748233172238350107850275304,
    2098478828474011932436660412517,
    55581415166113811149459800483533,
    38992368544603139932233054999993551,
];

// sqrt(1.0001)^-(2^i) in Q64.64
const NEGATIVE_RATIOS_X64: [u128; 18] = [
    18444899583751176498,
    18443055278223354162,
    18439367220385604838,
    18431993317065449817,
    18417254355718160513,
    18387811781193591352,
    18329067761203520168,
    18212142134806087854,
    17980523815641551639,
    17526086738831147013,
    16651378430235024244,
    15030750278693429944,
    12247334978882834399,
    8131365268884726200,
    3584323654723342297,
    696457651847595233,
    26294789957452057,
    37481735321082,
];

/// Sqrt price (Q64.64) at the given tick index
pub fn sqrt_price_from_tick_index(tick: i32) -> ComposeResult<u128> {
    if !(MIN_TICK_INDEX..=MAX_TICK_INDEX).contains(&tick) {
        return Err(PositionError::InvalidRange(format!(
            "tick {} outside [{}, {}]",
            tick, MIN_TICK_INDEX, MAX_TICK_INDEX
        )));
    }
    Ok(if tick >= 0 {
        sqrt_price_positive_tick(tick)
    } else {
        sqrt_price_negative_tick(tick)
    })
}

fn sqrt_price_positive_tick(tick: i32) -> u128 {
    let mut ratio: u128 = if tick & 1 != 0 {
        79232123823359799118286999567
    } else {
        79228162514264337593543950336
    };
    for (bit, factor) in POSITIVE_RATIOS_X96.iter().enumerate() {
        if tick & (2 << bit) != 0 {
            ratio = mul_shift_96(ratio, *factor);
        }
    }
    ratio >> 32
}

fn sqrt_price_negative_tick(tick: i32) -> u128 {
    let abs_tick = tick.unsigned_abs();
    let mut ratio: u128 = if abs_tick & 1 != 0 {
        18445821805675392311
    } else {
        18446744073709551616
    };
    for (bit, factor) in NEGATIVE_RATIOS_X64.iter().enumerate() {
        if abs_tick & (2 << bit) != 0 {
            // ratio <= 2^64 and factor < 2^64, the product fits in u128
            ratio = (ratio * factor) >> 64;
        }
    }
    ratio
}

fn mul_shift_96(n0: u128, n1: u128) -> u128 {
    ((U256::from(n0) * U256::from(n1)) >> 96u32).as_u128()
}

/// Greatest tick whose sqrt price is <= the given sqrt price
pub fn tick_index_from_sqrt_price(sqrt_price_x64: u128) -> ComposeResult<i32> {
    if !(MIN_SQRT_PRICE_X64..=MAX_SQRT_PRICE_X64).contains(&sqrt_price_x64) {
        return Err(PositionError::InvalidRange(format!(
            "sqrt price {} outside supported bounds",
            sqrt_price_x64
        )));
    }

    let msb: u32 = 128 - sqrt_price_x64.leading_zeros() - 1;
    let log2p_integer_x32 = (msb as i128 - 64) << 32;

    let mut bit: i128 = 0x8000_0000_0000_0000i128;
    let mut precision = 0;
    let mut log2p_fraction_x64 = 0;
    let mut r = if msb >= 64 {
        sqrt_price_x64 >> (msb - 63)
    } else {
        sqrt_price_x64 << (63 - msb)
    };

    while bit > 0 && precision < BIT_PRECISION {
        r *= r;
        let is_r_more_than_two = r >> 127_u32;
        r >>= 63 + is_r_more_than_two;
        log2p_fraction_x64 += bit * is_r_more_than_two as i128;
        bit >>= 1;
        precision += 1;
    }

    let log2p_x32 = log2p_integer_x32 + (log2p_fraction_x64 >> 32);
    let logbp_x64 = log2p_x32 * LOG_B_2_X32;

    let tick_low = ((logbp_x64 - LOG_B_P_ERR_MARGIN_LOWER_X64) >> 64) as i32;
    let tick_high = ((logbp_x64 + LOG_B_P_ERR_MARGIN_UPPER_X64) >> 64) as i32;

    if tick_low == tick_high {
        return Ok(tick_low);
    }
    if sqrt_price_from_tick_index(tick_high)? <= sqrt_price_x64 {
        Ok(tick_high)
    } else {
        Ok(tick_low)
    }
}

/// Human price (B per A) for a sqrt price
pub fn sqrt_price_to_price(sqrt_price_x64: u128, decimals_a: u8, decimals_b: u8) -> f64 {
    let sqrt = sqrt_price_x64 as f64 / 2f64.powi(64);
    sqrt * sqrt * 10f64.powi(decimals_a as i32 - decimals_b as i32)
}

/// Sqrt price (Q64.64) for a human price, clamped to the supported bounds
pub fn price_to_sqrt_price(price: f64, decimals_a: u8, decimals_b: u8) -> ComposeResult<u128> {
    if !price.is_finite() || price <= 0.0 {
        return Err(PositionError::InvalidRange(format!(
            "price must be positive and finite, got {}",
            price
        )));
    }
    let raw = price / 10f64.powi(decimals_a as i32 - decimals_b as i32);
    let sqrt_x64 = raw.sqrt() * 2f64.powi(64);
    if sqrt_x64 >= MAX_SQRT_PRICE_X64 as f64 {
        return Ok(MAX_SQRT_PRICE_X64);
    }
    Ok((sqrt_x64 as u128).max(MIN_SQRT_PRICE_X64))
}

/// Start index of the tick array that holds `tick`
pub fn tick_array_start_index(tick: i32, tick_spacing: u16) -> i32 {
    let ticks_in_array = TICK_ARRAY_SIZE * tick_spacing as i32;
    tick.div_euclid(ticks_in_array) * ticks_in_array
}

pub fn min_usable_tick(tick_spacing: u16) -> i32 {
    let spacing = tick_spacing as i32;
    (MIN_TICK_INDEX / spacing) * spacing
}

pub fn max_usable_tick(tick_spacing: u16) -> i32 {
    let spacing = tick_spacing as i32;
    (MAX_TICK_INDEX / spacing) * spacing
}
