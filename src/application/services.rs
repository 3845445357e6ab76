//! Application services and use cases
//!
//! `PositionService` reads fresh state through its sources on every call, hands
//! it to the pure composer and builds the transaction the submitter signs.

use std::sync::Arc;

use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use tracing::{error, info, warn};

use crate::domain::context::EngineContext;
use crate::domain::distribution::{aggregate, Distribution};
use crate::domain::execution::{
    ChainSubmitter, DepositPlan, DepositRequest, InstructionPlan, LifecycleState, TransactionBuilder,
    TransactionComposer, TransactionLifecycle, WithdrawAmount, WithdrawPlan,
};
use crate::domain::liquidity::{quote_deposit_for_range, LiquidityQuote, WithdrawQuote};
use crate::domain::pool::PoolSource;
use crate::domain::position::{position_amounts, position_status, PositionSource, PositionStatus};
use crate::domain::price::PriceOracle;
use crate::shared::errors::{ComposeResult, PositionError};
use crate::shared::types::{to_base_units, PoolSnapshot, Position, PriceRange, TokenSide};

/// One user action, amounts in display units
#[derive(Debug, Clone)]
pub enum ActionRequest {
    Deposit {
        pool: Pubkey,
        range: PriceRange,
        input: TokenSide,
        amount: f64,
        slippage_bps: Option<u16>,
    },
    Withdraw {
        position: Pubkey,
        amount: WithdrawAmount,
        slippage_bps: Option<u16>,
    },
    Collect {
        position: Pubkey,
    },
    Close {
        position: Pubkey,
        slippage_bps: Option<u16>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionPlan {
    Deposit(DepositPlan),
    Withdraw(WithdrawPlan),
    Collect { plan: InstructionPlan },
    Close { plan: InstructionPlan, quote: Option<WithdrawQuote> },
}

impl ActionPlan {
    pub fn plan(&self) -> &InstructionPlan {
        match self {
            ActionPlan::Deposit(deposit) => &deposit.plan,
            ActionPlan::Withdraw(withdraw) => &withdraw.plan,
            ActionPlan::Collect { plan } | ActionPlan::Close { plan, .. } => plan,
        }
    }
}

/// A composed plan and the partially signed transaction that carries it
#[derive(Debug, Clone, Serialize)]
pub struct PreparedAction {
    pub action: ActionPlan,
    pub transaction_size: usize,
    #[serde(skip)]
    pub transaction: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub plan_id: String,
    pub signature: String,
    pub state: LifecycleState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub position: Position,
    pub status: PositionStatus,
    pub amount_a: u64,
    pub amount_b: u64,
}

/// Service facade over the position engine
pub struct PositionService {
    ctx: EngineContext,
    pools: Arc<dyn PoolSource>,
    positions: Arc<dyn PositionSource>,
    oracle: Arc<dyn PriceOracle>,
    builder: TransactionBuilder,
}

impl PositionService {
    pub fn new(
        ctx: EngineContext,
        pools: Arc<dyn PoolSource>,
        positions: Arc<dyn PositionSource>,
        oracle: Arc<dyn PriceOracle>,
        builder: TransactionBuilder,
    ) -> Self {
        Self { ctx, pools, positions, oracle, builder }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    async fn load_position(&self, address: &Pubkey) -> ComposeResult<(PoolSnapshot, Position)> {
        let position = self
            .positions
            .position(address)
            .await?
            .ok_or_else(|| PositionError::PositionNotFound(format!("position {} does not exist", address)))?;
        let pool = self.pools.pool_snapshot(&position.whirlpool).await?;
        Ok((pool, position))
    }

    /// Deposit quote without composing any instructions
    pub async fn quote_deposit(
        &self,
        pool_address: &Pubkey,
        range: &PriceRange,
        input: TokenSide,
        amount: f64,
        slippage_bps: Option<u16>,
    ) -> ComposeResult<LiquidityQuote> {
        let pool = self.pools.pool_snapshot(pool_address).await?;
        let amount = to_base_units(amount, pool.token(input).decimals)?;
        quote_deposit_for_range(&pool, range, input, amount, self.ctx.slippage_or_default(slippage_bps))
    }

    /// Compose `request` against fresh state and build its transaction
    pub async fn prepare(&self, wallet: &Pubkey, request: &ActionRequest) -> ComposeResult<PreparedAction> {
        let composer = TransactionComposer::new(&self.ctx);
        let position_mint = Keypair::new();

        let (action, pool_address) = match request {
            ActionRequest::Deposit { pool, range, input, amount, slippage_bps } => {
                let snapshot = self.pools.pool_snapshot(pool).await?;
                let wallet_positions = self.positions.positions_for_owner(wallet, pool).await?;
                let deposit = DepositRequest {
                    wallet: *wallet,
                    range: *range,
                    input: *input,
                    amount: to_base_units(*amount, snapshot.token(*input).decimals)?,
                    slippage_bps: self.ctx.slippage_or_default(*slippage_bps),
                };
                let plan = composer.compose_deposit(&snapshot, &deposit, &wallet_positions, &position_mint.pubkey())?;
                (ActionPlan::Deposit(plan), snapshot.address)
            }
            ActionRequest::Withdraw { position, amount, slippage_bps } => {
                let (snapshot, position) = self.load_position(position).await?;
                let plan = composer.compose_withdraw(
                    &snapshot,
                    wallet,
                    &position,
                    *amount,
                    self.ctx.slippage_or_default(*slippage_bps),
                )?;
                (ActionPlan::Withdraw(plan), snapshot.address)
            }
            ActionRequest::Collect { position } => {
                let (snapshot, position) = self.load_position(position).await?;
                let plan = composer.compose_collect(&snapshot, wallet, &position)?;
                (ActionPlan::Collect { plan }, snapshot.address)
            }
            ActionRequest::Close { position, slippage_bps } => {
                let (snapshot, position) = self.load_position(position).await?;
                let (plan, quote) = composer.compose_close(
                    &snapshot,
                    wallet,
                    &position,
                    self.ctx.slippage_or_default(*slippage_bps),
                )?;
                (ActionPlan::Close { plan, quote }, snapshot.address)
            }
        };

        let opens_position = matches!(&action, ActionPlan::Deposit(deposit) if deposit.position.is_new);
        let signers: Vec<&Keypair> = if opens_position { vec![&position_mint] } else { Vec::new() };
        let blockhash = self.pools.latest_blockhash().await?;
        let transaction =
            self.builder
                .build_unsigned(action.plan(), &self.ctx.program_id, wallet, blockhash, &signers)?;
        let transaction = TransactionBuilder::serialize(&transaction)?;
        info!(
            "📝 Prepared {:?} plan {} on pool {} ({} bytes)",
            action.plan().action,
            action.plan().id,
            pool_address,
            transaction.len()
        );
        Ok(PreparedAction {
            transaction_size: transaction.len(),
            action,
            transaction,
        })
    }

    /// Compose, sign and submit one action, publishing progress on `lifecycle`
    ///
    /// Never resubmits. A `ConfirmationTimeout` means the outcome is unknown.
    pub async fn execute(
        &self,
        wallet: &Pubkey,
        request: &ActionRequest,
        submitter: &dyn ChainSubmitter,
        lifecycle: &TransactionLifecycle,
    ) -> ComposeResult<ExecutionReport> {
        lifecycle.reset();
        lifecycle
            .advance(LifecycleState::Building)
            .map_err(|e| PositionError::SubmissionFailure(format!("another action is in progress: {}", e)))?;

        let prepared = match self.prepare(wallet, request).await {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("Compose failed: {}", e);
                lifecycle.fail();
                return Err(e);
            }
        };
        let plan_id = prepared.action.plan().id.clone();
        if let Err(e) = lifecycle.advance(LifecycleState::Signing) {
            lifecycle.fail();
            return Err(PositionError::SubmissionFailure(e.to_string()));
        }

        let outcome = match submitter.submit_with_progress(prepared.transaction, lifecycle).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ Plan {} failed: {}", plan_id, e);
                lifecycle.fail();
                return Err(e);
            }
        };
        if lifecycle.state() == LifecycleState::Signing {
            let _ = lifecycle.advance(LifecycleState::Confirming);
        }

        if !outcome.confirmed {
            lifecycle.fail();
            return Err(PositionError::SubmissionFailure(format!(
                "transaction {} failed: {}",
                outcome.signature,
                outcome.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        if let Err(e) = lifecycle.advance(LifecycleState::Success) {
            warn!("{}", e);
        }
        info!("✅ Plan {} landed as {}", plan_id, outcome.signature);
        Ok(ExecutionReport {
            plan_id,
            signature: outcome.signature,
            state: lifecycle.state(),
        })
    }

    /// Bucketed liquidity around the current USD price of `display`
    pub async fn get_distribution(&self, pool_address: &Pubkey, display: TokenSide) -> ComposeResult<Distribution> {
        let pool = self.pools.pool_snapshot(pool_address).await?;
        let samples = self
            .pools
            .tick_samples(&pool, self.ctx.distribution.tick_arrays_per_side)
            .await?;
        let prices = self.oracle.pool_prices(&pool).await?;
        aggregate(&samples, prices, display, &self.ctx.distribution, self.ctx.is_pegged(&pool))
    }

    pub async fn list_positions(&self, wallet: &Pubkey, pool_address: &Pubkey) -> ComposeResult<Vec<PositionView>> {
        let pool = self.pools.pool_snapshot(pool_address).await?;
        let mut positions = self.positions.positions_for_owner(wallet, pool_address).await?;
        positions.sort_by_key(|p| (p.tick_lower_index, p.tick_upper_index, p.address));
        positions
            .into_iter()
            .map(|position| {
                let (amount_a, amount_b) = position_amounts(&pool, &position)?;
                Ok(PositionView {
                    status: position_status(&pool, &position),
                    position,
                    amount_a,
                    amount_b,
                })
            })
            .collect()
    }
}
