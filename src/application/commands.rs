//! CLI commands
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::shared::types::TokenSide;

#[derive(Parser, Debug)]
#[command(name = "clmm-lp")]
#[command(version, about = "Concentrated-liquidity position manager for Orca Whirlpools")]
pub struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// RPC endpoint URL (overrides config)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Path to keypair file (overrides config)
    #[arg(long, global = true)]
    pub keypair: Option<String>,

    /// Position source: rpc or indexer (overrides config)
    #[arg(long, global = true)]
    pub position_source: Option<String>,

    /// Log filter, e.g. `info` or `clmm_lp=debug`
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Compose and print the plan without submitting
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenArg {
    A,
    B,
}

impl From<TokenArg> for TokenSide {
    fn from(arg: TokenArg) -> Self {
        match arg {
            TokenArg::A => TokenSide::A,
            TokenArg::B => TokenSide::B,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DepositArgs {
    /// Whirlpool address
    #[arg(long)]
    pub pool: String,

    /// Lower bound, token B per token A
    #[arg(long)]
    pub lower: String,

    /// Upper bound, token B per token A
    #[arg(long)]
    pub upper: String,

    /// Token the amount is given in
    #[arg(long, value_enum, default_value_t = TokenArg::A)]
    pub token: TokenArg,

    /// Amount in display units
    #[arg(long)]
    pub amount: f64,

    /// Slippage tolerance in basis points
    #[arg(long)]
    pub slippage_bps: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Quote a deposit without composing instructions
    Quote(DepositArgs),

    /// Open a position or add to the matching one
    Deposit(DepositArgs),

    /// Remove liquidity from a position
    Withdraw {
        /// Position account address
        #[arg(long)]
        position: String,

        /// Share of the position's liquidity to remove, in (0, 100]
        #[arg(long, conflicts_with = "liquidity")]
        percentage: Option<f64>,

        /// Exact liquidity to remove
        #[arg(long)]
        liquidity: Option<u128>,

        #[arg(long)]
        slippage_bps: Option<u16>,
    },

    /// Collect owed fees
    Collect {
        #[arg(long)]
        position: String,
    },

    /// Withdraw everything, collect and close the position
    Close {
        #[arg(long)]
        position: String,

        #[arg(long)]
        slippage_bps: Option<u16>,
    },

    /// List the wallet's positions in a pool
    Positions {
        #[arg(long)]
        pool: String,
    },

    /// Show the pool's liquidity distribution around the current price
    Distribution {
        #[arg(long)]
        pool: String,

        /// Token whose USD price forms the axis
        #[arg(long, value_enum, default_value_t = TokenArg::A)]
        token: TokenArg,

        /// Print JSON instead of a histogram
        #[arg(long)]
        json: bool,
    },

    /// Suggest a price range from recent volatility
    SuggestRange {
        /// Token symbol, e.g. sol
        #[arg(long)]
        token: String,

        #[arg(long)]
        price: f64,

        /// Comma-separated daily closes, oldest first
        #[arg(long, value_delimiter = ',')]
        closes: Vec<f64>,

        /// 24h change in percent
        #[arg(long, allow_hyphen_values = true)]
        change_24h: Option<f64>,

        #[arg(long, default_value_t = 0.80)]
        confidence: f64,
    },
}
