use tracing::debug;

use super::synthetic::synthetic_buckets;
use super::{Distribution, DistributionSettings, LiquidityBucket, SyntheticReason, TickSample, UsdPrices};
use crate::shared::errors::{ComposeResult, PositionError};
use crate::shared::types::TokenSide;

/// USD price of the displayed token implied by a sample, `None` when undefined
fn sample_usd_price(sample: &TickSample, prices: &UsdPrices, display: TokenSide) -> Option<f64> {
    let usd = match display {
        TokenSide::A => sample.ratio_price * prices.token_b,
        TokenSide::B => {
            if !(sample.ratio_price > 0.0) {
                return None;
            }
            prices.token_a / sample.ratio_price
        }
    };
    usd.is_finite().then_some(usd)
}

/// Log-scaled heights mapped into `[min_height, max_height]`; empty buckets stay at 0
pub fn normalize_heights(buckets: &mut [LiquidityBucket], min_height: f64, max_height: f64) {
    let max = buckets.iter().map(|b| b.liquidity).max().unwrap_or(0);
    if max == 0 {
        buckets.iter_mut().for_each(|b| b.height = 0.0);
        return;
    }
    let denominator = (max as f64).ln_1p();
    for bucket in buckets.iter_mut() {
        bucket.height = if bucket.liquidity == 0 {
            0.0
        } else {
            min_height + (max_height - min_height) * (bucket.liquidity as f64).ln_1p() / denominator
        };
    }
}

/// Bucket raw tick liquidity into a fixed-width USD window around the current price
pub fn aggregate(
    samples: &[TickSample],
    prices: UsdPrices,
    display: TokenSide,
    settings: &DistributionSettings,
    pegged: bool,
) -> ComposeResult<Distribution> {
    let current = prices.for_side(display);
    if !current.is_finite() || current <= 0.0 {
        return Err(PositionError::InvalidAmount(format!(
            "USD price of token {} must be positive, got {}",
            display, current
        )));
    }
    let fraction = settings.window_fraction;
    if !(fraction > 0.0 && fraction < 2.0) {
        return Err(PositionError::InvalidRange(format!(
            "window fraction must be in (0, 2), got {}",
            fraction
        )));
    }
    if settings.bucket_count == 0 {
        return Err(PositionError::InvalidRange("bucket count must be positive".to_string()));
    }

    let count = settings.bucket_count;
    let window_low = current * (1.0 - fraction / 2.0);
    let window_high = current * (1.0 + fraction / 2.0);
    let width = (window_high - window_low) / count as f64;

    let mut buckets: Vec<LiquidityBucket> = (0..count)
        .map(|i| LiquidityBucket {
            price_start: window_low + width * i as f64,
            price_end: if i + 1 == count { window_high } else { window_low + width * (i + 1) as f64 },
            liquidity: 0,
            height: 0.0,
        })
        .collect();

    let mut in_window = 0usize;
    for sample in samples {
        let Some(usd) = sample_usd_price(sample, &prices, display) else {
            continue;
        };
        if usd < window_low || usd > window_high {
            continue;
        }
        let index = (((usd - window_low) / width).floor() as usize).min(count - 1);
        buckets[index].liquidity = buckets[index].liquidity.saturating_add(sample.liquidity);
        in_window += 1;
    }

    let synthetic_reason = if pegged {
        Some(SyntheticReason::PeggedPair)
    } else if in_window < settings.min_samples {
        Some(SyntheticReason::SparseData { in_window_samples: in_window })
    } else {
        None
    };

    let buckets = match synthetic_reason {
        Some(reason) => {
            debug!(
                "Using synthetic distribution ({:?}) with {} in-window samples",
                reason, in_window
            );
            synthetic_buckets(window_low, window_high, settings)
        }
        None => {
            normalize_heights(&mut buckets, settings.min_height, settings.max_height);
            buckets
        }
    };

    Ok(Distribution {
        display_token: display,
        current_usd_price: current,
        window_low,
        window_high,
        buckets,
        is_synthetic: synthetic_reason.is_some(),
        synthetic_reason,
        in_window_samples: in_window,
    })
}
