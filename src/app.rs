// src/app.rs
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use tracing::{info, warn};

use clmm_lp::application::{ActionRequest, Cli, Commands, PositionService};
use clmm_lp::domain::bounds::{suggest_range, RangeRequest};
use clmm_lp::domain::execution::{ComputeBudget, TransactionBuilder, TransactionLifecycle, WithdrawAmount};
use clmm_lp::infrastructure::blockchain::{
    build_position_source, parse_commitment, RpcChainSubmitter, RpcPoolSource, SolanaRpcClient,
    StaticPriceOracle, SubmitterConfig,
};
use clmm_lp::domain::pool::PoolSource;
use clmm_lp::shared::config::Config;
use clmm_lp::shared::errors::AppError;
use clmm_lp::shared::types::PriceRange;
use clmm_lp::shared::utils::format_amount;

use crate::report;

/// Everything a chain-facing command needs
struct AppCtx {
    cfg: Config,
    rpc: SolanaRpcClient,
    pools: Arc<RpcPoolSource>,
    service: PositionService,
}

impl AppCtx {
    fn new(cfg: Config) -> Result<Self> {
        let ctx = cfg.engine_context()?;
        let rpc = SolanaRpcClient::new(cfg.rpc.url.clone(), parse_commitment(&cfg.rpc.commitment));
        let pools = Arc::new(RpcPoolSource::new(rpc.clone(), ctx.program_id));
        let positions = build_position_source(&cfg.positions, rpc.clone(), ctx.program_id)?;
        let oracle = Arc::new(StaticPriceOracle::from_config(&cfg.prices)?);
        let builder = TransactionBuilder::new(ComputeBudget {
            unit_limit: cfg.engine.compute_unit_limit,
            priority_fee_micro_lamports: cfg.engine.priority_fee_microlamports,
        });
        info!(
            "Using RPC {} with {} position source",
            cfg.rpc.url,
            positions.name()
        );
        let service = PositionService::new(ctx, pools.clone(), positions, oracle, builder);
        Ok(Self { cfg, rpc, pools, service })
    }

    fn wallet(&self) -> Result<Keypair, AppError> {
        read_keypair_file(&self.cfg.wallet.keypair).map_err(|e| {
            AppError::WalletError(format!("Failed to load keypair {}: {}", self.cfg.wallet.keypair, e))
        })
    }
}

fn parse_pubkey(value: &str, what: &str) -> Result<Pubkey> {
    value.parse().with_context(|| format!("invalid {} address {}", what, value))
}

pub async fn run(cli: Cli, cfg: Config) -> Result<()> {
    let dry_run = cli.dry_run;
    let request = match cli.command {
        Commands::SuggestRange { token, price, closes, change_24h, confidence } => {
            let suggestion = suggest_range(&RangeRequest {
                token,
                current_price: price,
                daily_closes: closes,
                change_24h_pct: change_24h,
                confidence,
            })?;
            println!("{}", report::suggestion_json(&suggestion)?);
            return Ok(());
        }
        Commands::Quote(args) => {
            let app = AppCtx::new(cfg)?;
            let pool_address = parse_pubkey(&args.pool, "pool")?;
            let range = PriceRange::parse(&args.lower, &args.upper)?;
            let pool = app.pools.pool_snapshot(&pool_address).await?;
            println!("{}", report::pool_summary(&pool));
            let quote = app
                .service
                .quote_deposit(&pool_address, &range, args.token.into(), args.amount, args.slippage_bps)
                .await?;
            let (decimals_a, decimals_b) = pool.decimals();
            println!("{}", report::QuoteReport::new(&quote, decimals_a, decimals_b).to_json()?);
            return Ok(());
        }
        Commands::Positions { pool } => {
            let app = AppCtx::new(cfg)?;
            let owner = app.wallet()?.pubkey();
            let pool_address = parse_pubkey(&pool, "pool")?;
            let views = app.service.list_positions(&owner, &pool_address).await?;
            info!("🔍 {} positions for {}", views.len(), owner);
            let pool = app.pools.pool_snapshot(&pool_address).await?;
            for view in &views {
                info!(
                    "  {} [{}, {}) {:?}: {} A / {} B",
                    view.position.address,
                    view.position.tick_lower_index,
                    view.position.tick_upper_index,
                    view.status,
                    format_amount(view.amount_a, pool.token_a.decimals),
                    format_amount(view.amount_b, pool.token_b.decimals)
                );
            }
            println!("{}", report::positions_json(&views)?);
            return Ok(());
        }
        Commands::Distribution { pool, token, json } => {
            let app = AppCtx::new(cfg)?;
            let distribution = app
                .service
                .get_distribution(&parse_pubkey(&pool, "pool")?, token.into())
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&distribution)?);
            } else {
                print!("{}", report::render_distribution(&distribution));
            }
            return Ok(());
        }
        Commands::Deposit(args) => ActionRequest::Deposit {
            pool: parse_pubkey(&args.pool, "pool")?,
            range: PriceRange::parse(&args.lower, &args.upper)?,
            input: args.token.into(),
            amount: args.amount,
            slippage_bps: args.slippage_bps,
        },
        Commands::Withdraw { position, percentage, liquidity, slippage_bps } => {
            let amount = match (percentage, liquidity) {
                (Some(percentage), None) => WithdrawAmount::Percentage(percentage),
                (None, Some(liquidity)) => WithdrawAmount::Liquidity(liquidity),
                _ => return Err(anyhow!("withdraw needs exactly one of --percentage or --liquidity")),
            };
            ActionRequest::Withdraw {
                position: parse_pubkey(&position, "position")?,
                amount,
                slippage_bps,
            }
        }
        Commands::Collect { position } => ActionRequest::Collect {
            position: parse_pubkey(&position, "position")?,
        },
        Commands::Close { position, slippage_bps } => ActionRequest::Close {
            position: parse_pubkey(&position, "position")?,
            slippage_bps,
        },
    };

    let app = AppCtx::new(cfg)?;
    let wallet = Arc::new(app.wallet()?);
    info!("Loaded keypair: {}", wallet.pubkey());

    if dry_run {
        let prepared = app.service.prepare(&wallet.pubkey(), &request).await?;
        info!("Dry run - not submitting");
        println!("{}", report::ActionReport::new(&prepared, true).to_json()?);
        return Ok(());
    }

    let submitter = RpcChainSubmitter::new(
        app.rpc.clone(),
        wallet.clone(),
        SubmitterConfig {
            confirmation_timeout: Duration::from_secs(app.cfg.engine.confirmation_timeout_secs),
            ..Default::default()
        },
    );
    let lifecycle = TransactionLifecycle::new();
    let mut states = lifecycle.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow();
            info!("⏳ {}", state);
            if state.is_terminal() {
                break;
            }
        }
    });

    let result = app.service.execute(&wallet.pubkey(), &request, &submitter, &lifecycle).await;
    progress.abort();
    match result {
        Ok(execution) => {
            info!("✅ {} confirmed: {}", execution.plan_id, execution.signature);
            println!("{}", serde_json::to_string_pretty(&execution)?);
            Ok(())
        }
        Err(e) if e.is_validation() => {
            warn!("Rejected before submission ({})", e.kind().as_str());
            Err(e.into())
        }
        Err(e) if e.is_ambiguous() => {
            warn!("Outcome unknown; check the signature before retrying");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
