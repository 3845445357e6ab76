//! Representative Gaussian distribution for pegged or sparsely populated pools

use super::{DistributionSettings, LiquidityBucket};

/// Liquidity assigned to the peak bucket of a synthetic curve
pub const SYNTHETIC_PEAK_LIQUIDITY: u128 = 1_000_000;

// Standard deviations between the window midpoint and either edge
const SIGMAS_PER_HALF_WINDOW: f64 = 3.0;

/// Smooth unimodal buckets centered on the window midpoint
///
/// Heights follow the curve linearly so the shape stays recognizably bell-shaped.
pub fn synthetic_buckets(window_low: f64, window_high: f64, settings: &DistributionSettings) -> Vec<LiquidityBucket> {
    let count = settings.bucket_count.max(1);
    let width = (window_high - window_low) / count as f64;
    let center = (window_low + window_high) / 2.0;
    let sigma = (window_high - window_low) / (2.0 * SIGMAS_PER_HALF_WINDOW);

    (0..count)
        .map(|i| {
            let price_start = window_low + width * i as f64;
            let price_end = if i + 1 == count { window_high } else { price_start + width };
            let z = ((price_start + price_end) / 2.0 - center) / sigma;
            let weight = (-0.5 * z * z).exp();
            LiquidityBucket {
                price_start,
                price_end,
                liquidity: (weight * SYNTHETIC_PEAK_LIQUIDITY as f64).round() as u128,
                height: settings.min_height + (settings.max_height - settings.min_height) * weight,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_curve_is_symmetric_and_unimodal() {
        let settings = DistributionSettings::default();
        let buckets = synthetic_buckets(80.0, 120.0, &settings);
        assert_eq!(buckets.len(), 64);

        for i in 0..32 {
            assert!((buckets[i].height - buckets[63 - i].height).abs() < 1e-9);
        }
        for i in 1..32 {
            assert!(buckets[i].height >= buckets[i - 1].height);
        }
        assert!(buckets[31].height > 0.9);
        assert!(buckets[0].height < 0.15);
        assert!(buckets.iter().all(|b| b.liquidity <= SYNTHETIC_PEAK_LIQUIDITY));
    }

    #[test]
    fn test_synthetic_buckets_cover_window() {
        let settings = DistributionSettings { bucket_count: 8, ..Default::default() };
        let buckets = synthetic_buckets(10.0, 18.0, &settings);
        assert_eq!(buckets[0].price_start, 10.0);
        assert_eq!(buckets[7].price_end, 18.0);
        for pair in buckets.windows(2) {
            assert!((pair[0].price_end - pair[1].price_start).abs() < 1e-12);
        }
    }
}
