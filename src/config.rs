use std::path::Path;

use anyhow::{Context, Result};
use clmm_lp::application::Cli;
use clmm_lp::shared::config::{Config, ConfigLoader, PositionSourceKind};

const DEFAULT_CONFIG_PATH: &str = "Config.toml";

/// Config with priority: CLI args > config file > defaults
pub fn resolve(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => ConfigLoader::load(path).with_context(|| format!("load config {}", path))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            ConfigLoader::load(DEFAULT_CONFIG_PATH).context("load Config.toml")?
        }
        None => Config::default(),
    };

    if let Some(rpc_url) = &cli.rpc_url {
        cfg.rpc.url = rpc_url.clone();
    }
    if let Some(keypair) = &cli.keypair {
        cfg.wallet.keypair = keypair.clone();
    }
    if let Some(source) = &cli.position_source {
        cfg.positions.source = match source.as_str() {
            "rpc" => PositionSourceKind::Rpc,
            "indexer" => PositionSourceKind::Indexer,
            other => anyhow::bail!("unknown position source {}, expected rpc or indexer", other),
        };
    }
    cfg.wallet.keypair = expand_home(&cfg.wallet.keypair);
    cfg.validate()?;
    Ok(cfg)
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home, rest),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = Cli::try_parse_from([
            "clmm-lp",
            "--rpc-url",
            "http://localhost:8899",
            "--keypair",
            "/tmp/id.json",
            "suggest-range",
            "--token",
            "sol",
            "--price",
            "126",
        ])
        .unwrap();
        let cfg = resolve(&cli).unwrap();
        assert_eq!(cfg.rpc.url, "http://localhost:8899");
        assert_eq!(cfg.wallet.keypair, "/tmp/id.json");
    }

    #[test]
    fn test_indexer_override_requires_url() {
        let cli = Cli::try_parse_from([
            "clmm-lp",
            "--position-source",
            "indexer",
            "positions",
            "--pool",
            "P",
        ])
        .unwrap();
        assert!(resolve(&cli).is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/id.json"), "/abs/id.json");
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_home("~/id.json"), format!("{}/id.json", home));
        }
    }
}
