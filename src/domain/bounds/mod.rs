//! Volatility-based range suggestions
//!
//! Weekly volatility is scaled by a per-token multiplier and a confidence z-score,
//! then capped to a per-token maximum half-width.

use serde::{Deserialize, Serialize};

use crate::shared::errors::{ComposeResult, PositionError};
use crate::shared::types::PriceRange;

const STABLE_DAILY_VOLATILITY: f64 = 0.001;
const DEFAULT_DAILY_VOLATILITY: f64 = 0.05;
const MIN_CHANGE_DAILY_VOLATILITY: f64 = 0.02;
const RETURN_LOOKBACK: usize = 14;
const NEUTRAL_CONFIDENCE_SCORE: f64 = 50.0;

/// Calibration for one token symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenProfile {
    pub range_multiplier: f64,
    pub max_half_width: f64,
    pub is_stable: bool,
}

pub fn token_profile(symbol: &str) -> TokenProfile {
    let (range_multiplier, max_half_width, is_stable) = match symbol.to_ascii_lowercase().as_str() {
        "sol" => (0.50, 0.10, false),
        "jup" => (0.50, 0.12, false),
        "usdc" | "usdt" => (1.0, 0.005, true),
        "jupsol" => (0.48, 0.10, false),
        "pengu" => (0.35, 0.15, false),
        _ => (0.5, 0.15, false),
    };
    TokenProfile { range_multiplier, max_half_width, is_stable }
}

/// Two-sided z-score for a confidence level, 1.28 when the level is not tabulated
pub fn z_score(confidence: f64) -> f64 {
    const TABLE: [(f64, f64); 4] = [(0.68, 1.00), (0.80, 1.28), (0.90, 1.645), (0.95, 1.96)];
    TABLE
        .iter()
        .find(|(level, _)| (level - confidence).abs() < 1e-9)
        .map(|(_, z)| *z)
        .unwrap_or(1.28)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRequest {
    pub token: String,
    pub current_price: f64,
    /// Daily closing prices, oldest first
    pub daily_closes: Vec<f64>,
    /// Last 24h change in percent
    pub change_24h_pct: Option<f64>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSuggestion {
    pub lower: f64,
    pub upper: f64,
    pub range_width_pct: f64,
    pub safety_score: f64,
    pub weekly_volatility_pct: f64,
}

impl RangeSuggestion {
    pub fn price_range(&self) -> ComposeResult<PriceRange> {
        PriceRange::new(self.lower, self.upper)
    }
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn daily_volatility(profile: &TokenProfile, closes: &[f64], change_24h_pct: Option<f64>) -> f64 {
    if profile.is_stable {
        return STABLE_DAILY_VOLATILITY;
    }
    if closes.len() > 7 {
        let returns: Vec<f64> = closes
            .windows(2)
            .filter(|pair| pair[0] > 0.0)
            .map(|pair| pair[1] / pair[0] - 1.0)
            .collect();
        let recent = &returns[returns.len().saturating_sub(RETURN_LOOKBACK)..];
        return sample_std_dev(recent).unwrap_or(MIN_CHANGE_DAILY_VOLATILITY);
    }
    match change_24h_pct {
        Some(change) if change != 0.0 && change.is_finite() => {
            (change.abs() / 100.0 * 0.6).max(MIN_CHANGE_DAILY_VOLATILITY)
        }
        _ => DEFAULT_DAILY_VOLATILITY,
    }
}

pub fn suggest_range(request: &RangeRequest) -> ComposeResult<RangeSuggestion> {
    let price = request.current_price;
    if !price.is_finite() || price <= 0.0 {
        return Err(PositionError::InvalidAmount(format!(
            "current price must be positive, got {}",
            price
        )));
    }
    let profile = token_profile(&request.token);
    // The current price is the latest point of the history
    let mut closes = request.daily_closes.clone();
    if !closes.is_empty() {
        closes.push(price);
    }
    let weekly = daily_volatility(&profile, &closes, request.change_24h_pct) * 7f64.sqrt();
    let uncertainty = weekly * profile.range_multiplier * z_score(request.confidence);

    let lower = (price * (1.0 - uncertainty)).max(price * (1.0 - profile.max_half_width));
    let upper = (price * (1.0 + uncertainty)).min(price * (1.0 + profile.max_half_width));
    let range_width_pct = (upper - lower) / price * 100.0;

    let volatility_score = (100.0 - weekly * 500.0).max(0.0);
    let range_score = (100.0 - range_width_pct * 8.0).max(0.0);
    let safety_score = volatility_score * 0.4 + range_score * 0.4 + NEUTRAL_CONFIDENCE_SCORE * 0.2;

    Ok(RangeSuggestion {
        lower,
        upper,
        range_width_pct,
        safety_score,
        weekly_volatility_pct: weekly * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(token: &str, closes: Vec<f64>, change: Option<f64>) -> RangeRequest {
        RangeRequest {
            token: token.to_string(),
            current_price: 100.0,
            daily_closes: closes,
            change_24h_pct: change,
            confidence: 0.80,
        }
    }

    #[test]
    fn test_default_volatility_hits_token_cap() {
        // 0.05 * sqrt(7) * 0.5 * 1.28 = 8.47%, under the 10% SOL cap
        let suggestion = suggest_range(&request("SOL", vec![], None)).unwrap();
        let expected = 0.05 * 7f64.sqrt() * 0.5 * 1.28;
        assert!((suggestion.lower - 100.0 * (1.0 - expected)).abs() < 1e-9);
        assert!((suggestion.upper - 100.0 * (1.0 + expected)).abs() < 1e-9);

        let capped = suggest_range(&RangeRequest { confidence: 0.95, ..request("sol", vec![], None) }).unwrap();
        assert!((capped.lower - 90.0).abs() < 1e-9);
        assert!((capped.upper - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_stablecoin_range_is_tight() {
        let suggestion = suggest_range(&request("USDC", vec![], Some(5.0))).unwrap();
        assert!(suggestion.upper - suggestion.lower <= 1.0 + 1e-9);
        // Confidence is neutral, so the score cannot exceed 90
        assert!((suggestion.safety_score - 87.3035).abs() < 1e-3);
        assert!(suggestion.safety_score <= 90.0);
    }

    #[test]
    fn test_current_price_extends_history() {
        // Seven closes plus the current price cross the history threshold
        let closes = vec![100.0, 101.0, 99.0, 102.0, 100.0, 101.0, 100.0];
        let suggestion = suggest_range(&RangeRequest {
            current_price: 110.0,
            ..request("sol", closes, None)
        })
        .unwrap();
        assert!((suggestion.weekly_volatility_pct - 11.0868).abs() < 1e-3);
    }

    #[test]
    fn test_history_drives_volatility() {
        let flat: Vec<f64> = (0..20).map(|_| 100.0).collect();
        let suggestion = suggest_range(&request("jup", flat, Some(30.0))).unwrap();
        assert_eq!(suggestion.weekly_volatility_pct, 0.0);
        assert_eq!(suggestion.lower, 100.0);
        assert_eq!(suggestion.upper, 100.0);
        assert!(suggestion.price_range().is_err());
    }

    #[test]
    fn test_change_fallback_has_floor() {
        let profile = token_profile("pengu");
        assert_eq!(daily_volatility(&profile, &[], Some(1.0)), 0.02);
        assert!((daily_volatility(&profile, &[], Some(-10.0)) - 0.06).abs() < 1e-12);
        assert_eq!(daily_volatility(&profile, &[], None), 0.05);
    }

    #[test]
    fn test_invalid_price_rejected() {
        let bad = RangeRequest { current_price: 0.0, ..request("sol", vec![], None) };
        assert!(matches!(suggest_range(&bad), Err(PositionError::InvalidAmount(_))));
    }

    #[test]
    fn test_z_score_table() {
        assert_eq!(z_score(0.95), 1.96);
        assert_eq!(z_score(0.5), 1.28);
    }
}
