//! TOML configuration with defaults for every section

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::domain::context::{
    default_pegged_pairs, EngineContext, DEFAULT_MAX_SNAPSHOT_LAG_SLOTS, DEFAULT_SLIPPAGE_BPS,
};
use crate::domain::distribution::{DistributionSettings, PeggedPair};
use crate::domain::execution::WHIRLPOOL_PROGRAM_ID;
use crate::domain::liquidity::MAX_SLIPPAGE_BPS;
use crate::shared::errors::AppError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RpcCfg {
    pub url: String,
    pub commitment: String,
}

impl Default for RpcCfg {
    fn default() -> Self {
        Self {
            url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: "confirmed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WalletCfg {
    pub keypair: String,
}

impl Default for WalletCfg {
    fn default() -> Self {
        Self { keypair: "~/.config/solana/id.json".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgramsCfg {
    pub orca_whirlpool: String,
}

impl Default for ProgramsCfg {
    fn default() -> Self {
        Self { orca_whirlpool: WHIRLPOOL_PROGRAM_ID.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineCfg {
    pub default_slippage_bps: u16,
    pub max_snapshot_lag_slots: u64,
    pub confirmation_timeout_secs: u64,
    pub compute_unit_limit: u32,
    pub priority_fee_microlamports: u64,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            max_snapshot_lag_slots: DEFAULT_MAX_SNAPSHOT_LAG_SLOTS,
            confirmation_timeout_secs: 60,
            compute_unit_limit: 400_000,
            priority_fee_microlamports: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PositionSourceKind {
    #[default]
    Rpc,
    Indexer,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct PositionsCfg {
    pub source: PositionSourceKind,
    pub indexer_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcCfg,
    #[serde(default)]
    pub wallet: WalletCfg,
    #[serde(default)]
    pub programs: ProgramsCfg,
    #[serde(default)]
    pub engine: EngineCfg,
    #[serde(default)]
    pub positions: PositionsCfg,
    #[serde(default)]
    pub distribution: DistributionSettings,
    #[serde(default = "default_pegged_pairs")]
    pub pegged_pairs: Vec<PeggedPair>,
    /// USD prices keyed by mint address
    #[serde(default)]
    pub prices: HashMap<String, f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcCfg::default(),
            wallet: WalletCfg::default(),
            programs: ProgramsCfg::default(),
            engine: EngineCfg::default(),
            positions: PositionsCfg::default(),
            distribution: DistributionSettings::default(),
            pegged_pairs: default_pegged_pairs(),
            prices: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.program_id()?;
        if self.engine.default_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(AppError::ConfigError(format!(
                "engine.default_slippage_bps must be at most {}",
                MAX_SLIPPAGE_BPS
            )));
        }
        let d = &self.distribution;
        if !(d.window_fraction > 0.0 && d.window_fraction < 2.0) || d.bucket_count == 0 {
            return Err(AppError::ConfigError(
                "distribution.window_fraction must be in (0, 2) and bucket_count positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&d.min_height) || !(d.min_height..=1.0).contains(&d.max_height) {
            return Err(AppError::ConfigError(
                "distribution heights must satisfy 0 <= min_height <= max_height <= 1".to_string(),
            ));
        }
        if self.positions.source == PositionSourceKind::Indexer && self.positions.indexer_url.is_none() {
            return Err(AppError::ConfigError(
                "positions.indexer_url is required when positions.source = \"indexer\"".to_string(),
            ));
        }
        for (mint, price) in &self.prices {
            mint.parse::<Pubkey>()
                .map_err(|e| AppError::ConfigError(format!("Invalid mint in [prices] {}: {}", mint, e)))?;
            if !price.is_finite() || *price <= 0.0 {
                return Err(AppError::ConfigError(format!("Price for {} must be positive", mint)));
            }
        }
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey, AppError> {
        self.programs
            .orca_whirlpool
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid whirlpool program id: {}", e)))
    }

    pub fn engine_context(&self) -> Result<EngineContext, AppError> {
        Ok(EngineContext {
            program_id: self.program_id()?,
            default_slippage_bps: self.engine.default_slippage_bps,
            max_snapshot_lag_slots: self.engine.max_snapshot_lag_slots,
            distribution: self.distribution.clone(),
            pegged_pairs: self.pegged_pairs.clone(),
        })
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, AppError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Config::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::{SOL_MINT, USDC_MINT};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        let ctx = config.engine_context().unwrap();
        assert_eq!(ctx, EngineContext::default());
    }

    #[test]
    fn test_partial_sections_override() {
        let content = format!(
            r#"
[rpc]
url = "http://localhost:8899"

[engine]
default_slippage_bps = 100
max_snapshot_lag_slots = 0

[positions]
source = "indexer"
indexer_url = "http://localhost:3000"

[distribution]
bucket_count = 32

[[pegged_pairs]]
name = "SOL/USDC"
mint_a = "{}"
mint_b = "{}"

[prices]
"{}" = 126.0
"#,
            SOL_MINT, USDC_MINT, SOL_MINT
        );
        let config = Config::from_toml_str(&content).unwrap();
        assert_eq!(config.rpc.url, "http://localhost:8899");
        assert_eq!(config.rpc.commitment, "confirmed");
        assert_eq!(config.engine.confirmation_timeout_secs, 60);
        assert_eq!(config.positions.source, PositionSourceKind::Indexer);
        assert_eq!(config.distribution.bucket_count, 32);
        assert_eq!(config.distribution.min_samples, 20);
        assert_eq!(config.pegged_pairs.len(), 1);
        assert_eq!(config.prices.get(&SOL_MINT.to_string()), Some(&126.0));

        let ctx = config.engine_context().unwrap();
        assert_eq!(ctx.default_slippage_bps, 100);
        assert_eq!(ctx.max_snapshot_lag_slots, 0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml_str("[engine]\ndefault_slippage_bps = 20000").is_err());
        assert!(Config::from_toml_str("[positions]\nsource = \"indexer\"").is_err());
        assert!(Config::from_toml_str("[programs]\norca_whirlpool = \"nope\"").is_err());
        assert!(Config::from_toml_str("[distribution]\nwindow_fraction = 3.0").is_err());
        assert!(Config::from_toml_str("[prices]\nbad = 1.0").is_err());
        assert!(Config::from_toml_str("[rpc\n").is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml_str(include_str!("../../Config.example.toml")).unwrap();
        assert_eq!(config.engine, EngineCfg::default());
        assert_eq!(config.pegged_pairs.len(), 2);
        assert_eq!(config.prices.len(), 4);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ConfigLoader::load("/nonexistent/clmm-lp.toml"),
            Err(AppError::ConfigError(_))
        ));
    }
}
