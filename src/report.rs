// src/report.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

use clmm_lp::application::{PositionView, PreparedAction};
use clmm_lp::domain::bounds::RangeSuggestion;
use clmm_lp::domain::distribution::{Distribution, SyntheticReason};
use clmm_lp::domain::liquidity::LiquidityQuote;
use clmm_lp::shared::types::{from_base_units, PoolSnapshot};

const BAR_WIDTH: f64 = 50.0;

#[derive(Debug, Serialize)]
pub struct ActionReport<'a> {
    pub dry_run: bool,
    pub prepared: &'a PreparedAction,
    pub timestamp: DateTime<Utc>,
}

impl<'a> ActionReport<'a> {
    pub fn new(prepared: &'a PreparedAction, dry_run: bool) -> Self {
        Self {
            dry_run,
            prepared,
            timestamp: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteReport<'a> {
    pub quote: &'a LiquidityQuote,
    /// Display-unit amounts for the estimate
    pub est_a: f64,
    pub est_b: f64,
}

impl<'a> QuoteReport<'a> {
    pub fn new(quote: &'a LiquidityQuote, decimals_a: u8, decimals_b: u8) -> Self {
        Self {
            quote,
            est_a: from_base_units(quote.token_est_a, decimals_a),
            est_b: from_base_units(quote.token_est_b, decimals_b),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub fn suggestion_json(suggestion: &RangeSuggestion) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(suggestion)
}

pub fn positions_json(views: &[PositionView]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(views)
}

/// Text histogram, one row per bucket, current price marked
pub fn render_distribution(distribution: &Distribution) -> String {
    let mut out = format!(
        "Liquidity distribution for token {} (USD {:.4}, window {:.4} - {:.4})\n",
        distribution.display_token,
        distribution.current_usd_price,
        distribution.window_low,
        distribution.window_high
    );
    match distribution.synthetic_reason {
        Some(SyntheticReason::PeggedPair) => out.push_str("[synthetic: pegged pair]\n"),
        Some(SyntheticReason::SparseData { in_window_samples }) => {
            out.push_str(&format!("[synthetic: only {} ticks in window]\n", in_window_samples))
        }
        None => {}
    }
    for bucket in &distribution.buckets {
        let bar = "█".repeat((bucket.height * BAR_WIDTH).round() as usize);
        let current = distribution.current_usd_price >= bucket.price_start
            && distribution.current_usd_price < bucket.price_end;
        out.push_str(&format!(
            "{:>12.4} | {:<50}{}\n",
            bucket.price_start,
            bar,
            if current { " ◀" } else { "" }
        ));
    }
    out
}

pub fn pool_summary(pool: &PoolSnapshot) -> String {
    format!(
        "Pool {} | price {:.6} | tick {} | spacing {} | fee {:.2} bps | slot {}",
        pool.address,
        pool.current_price(),
        pool.tick_current_index,
        pool.tick_spacing,
        pool.fee_rate_bps(),
        pool.slot
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_lp::domain::distribution::LiquidityBucket;
    use clmm_lp::shared::types::TokenSide;

    fn distribution(reason: Option<SyntheticReason>) -> Distribution {
        let buckets = (0..4)
            .map(|i| LiquidityBucket {
                price_start: 100.0 + i as f64 * 10.0,
                price_end: 110.0 + i as f64 * 10.0,
                liquidity: i as u128,
                height: i as f64 / 4.0,
            })
            .collect();
        Distribution {
            display_token: TokenSide::A,
            current_usd_price: 125.0,
            window_low: 100.0,
            window_high: 140.0,
            buckets,
            is_synthetic: reason.is_some(),
            synthetic_reason: reason,
            in_window_samples: 3,
        }
    }

    #[test]
    fn test_histogram_rows_and_marker() {
        let text = render_distribution(&distribution(None));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[3].ends_with('◀'));
        assert!(!lines[1].contains('█'));
        assert!(!text.contains("synthetic"));
    }

    #[test]
    fn test_histogram_labels_synthetic() {
        let text = render_distribution(&distribution(Some(SyntheticReason::PeggedPair)));
        assert!(text.contains("[synthetic: pegged pair]"));
        let sparse = render_distribution(&distribution(Some(SyntheticReason::SparseData { in_window_samples: 3 })));
        assert!(sparse.contains("only 3 ticks"));
    }
}
