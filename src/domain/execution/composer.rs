//! Composes ordered, atomic instruction lists for position actions
//!
//! Every compose call validates its inputs first and either returns a complete
//! plan or an error; nothing is partially composed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::info;

use super::accounts::PositionAccounts;
use super::ops::WhirlpoolOp;
use crate::domain::context::EngineContext;
use crate::domain::liquidity::{
    liquidity_for_percentage, quote_deposit, quote_withdraw, validate_slippage, LiquidityQuote,
    WithdrawQuote,
};
use crate::domain::position::{resolve_ticks, Resolution};
use crate::domain::tick::{resolve_tick_range, TickRange};
use crate::shared::errors::{ComposeResult, PositionError};
use crate::shared::types::{pubkey_string, PoolSnapshot, Position, PriceRange, TokenSide};
use crate::shared::utils::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Deposit,
    Withdraw,
    Collect,
    Close,
}

/// Ordered operations that must land in one transaction
#[derive(Debug, Clone, Serialize)]
pub struct InstructionPlan {
    pub id: String,
    pub action: PlanAction,
    pub ops: Vec<WhirlpoolOp>,
    pub accounts: PositionAccounts,
    pub created_at: DateTime<Utc>,
}

impl InstructionPlan {
    fn new(action: PlanAction, ops: Vec<WhirlpoolOp>, accounts: PositionAccounts) -> Self {
        Self {
            id: generate_id(),
            action,
            ops,
            accounts,
            created_at: Utc::now(),
        }
    }

    pub fn op_names(&self) -> Vec<&'static str> {
        self.ops.iter().map(WhirlpoolOp::name).collect()
    }

    pub fn instructions(&self, program_id: &Pubkey) -> ComposeResult<Vec<Instruction>> {
        self.ops
            .iter()
            .map(|op| op.to_instruction(program_id, &self.accounts))
            .collect()
    }
}

/// Which position a plan acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionIdentity {
    #[serde(with = "pubkey_string")]
    pub address: Pubkey,
    #[serde(with = "pubkey_string")]
    pub position_mint: Pubkey,
    pub tick_range: TickRange,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositPlan {
    pub plan: InstructionPlan,
    pub position: PositionIdentity,
    pub quote: LiquidityQuote,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawPlan {
    pub plan: InstructionPlan,
    pub quote: WithdrawQuote,
}

/// Deposit parameters in base units
#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub wallet: Pubkey,
    pub range: PriceRange,
    pub input: TokenSide,
    pub amount: u64,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WithdrawAmount {
    /// Share of the position's liquidity in (0, 100]
    Percentage(f64),
    Liquidity(u128),
}

/// Replay the liquidity effect of `ops` and reject impossible sequences
pub fn validate_ops(ops: &[WhirlpoolOp], position: Option<&Position>) -> ComposeResult<()> {
    if ops.is_empty() {
        return Err(PositionError::InvalidAmount("no operations to compose".to_string()));
    }
    let mut liquidity = position.map(|p| p.liquidity).unwrap_or(0);
    let mut exists = position.is_some();

    for (index, op) in ops.iter().enumerate() {
        if !exists && !matches!(op, WhirlpoolOp::OpenPosition { .. }) {
            return Err(PositionError::PositionNotFound(format!(
                "{} requires an existing position",
                op.name()
            )));
        }
        match op {
            WhirlpoolOp::OpenPosition { .. } => {
                if exists || index != 0 {
                    return Err(PositionError::InvalidRange(
                        "open_position must be the first operation on a new position".to_string(),
                    ));
                }
                exists = true;
            }
            WhirlpoolOp::IncreaseLiquidity { liquidity: delta, .. } => {
                liquidity = liquidity.checked_add(*delta).ok_or_else(|| {
                    PositionError::MathOverflow("position liquidity exceeds u128".to_string())
                })?;
            }
            WhirlpoolOp::DecreaseLiquidity { liquidity: delta, .. } => {
                if *delta > liquidity {
                    return Err(PositionError::InsufficientLiquidity {
                        requested: *delta,
                        available: liquidity,
                    });
                }
                liquidity -= delta;
            }
            WhirlpoolOp::UpdateFeesAndRewards | WhirlpoolOp::CollectFees => {}
            WhirlpoolOp::ClosePosition => {
                if liquidity != 0 {
                    return Err(PositionError::PositionNotEmpty { liquidity });
                }
                if index != ops.len() - 1 {
                    return Err(PositionError::InvalidAmount(
                        "close_position must be the last operation".to_string(),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Builds instruction plans against one fresh snapshot
pub struct TransactionComposer<'a> {
    ctx: &'a EngineContext,
}

impl<'a> TransactionComposer<'a> {
    pub fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    fn check_ownership(&self, wallet: &Pubkey, pool: &PoolSnapshot, position: &Position) -> ComposeResult<()> {
        if position.owner != *wallet {
            return Err(PositionError::PositionNotFound(format!(
                "position {} is not held by {}",
                position.address, wallet
            )));
        }
        if position.whirlpool != pool.address {
            return Err(PositionError::PositionNotFound(format!(
                "position {} belongs to pool {}, not {}",
                position.address, position.whirlpool, pool.address
            )));
        }
        Ok(())
    }

    fn check_fresh(&self, pool: &PoolSnapshot, position: &Position) -> ComposeResult<()> {
        if pool.slot == 0 || position.slot == 0 {
            return Ok(());
        }
        let lag = pool.slot.abs_diff(position.slot);
        if lag > self.ctx.max_snapshot_lag_slots {
            return Err(PositionError::StaleSnapshot(format!(
                "pool read at slot {} and position at slot {} are {} slots apart (max {})",
                pool.slot, position.slot, lag, self.ctx.max_snapshot_lag_slots
            )));
        }
        Ok(())
    }

    fn accounts_for(&self, pool: &PoolSnapshot, wallet: &Pubkey, position: &Position) -> PositionAccounts {
        PositionAccounts::derive(
            &self.ctx.program_id,
            pool,
            wallet,
            &position.position_mint,
            TickRange {
                tick_lower: position.tick_lower_index,
                tick_upper: position.tick_upper_index,
            },
        )
    }

    /// Open-or-increase deposit
    ///
    /// `new_position_mint` is only used when no existing position matches.
    pub fn compose_deposit(
        &self,
        pool: &PoolSnapshot,
        request: &DepositRequest,
        wallet_positions: &[Position],
        new_position_mint: &Pubkey,
    ) -> ComposeResult<DepositPlan> {
        validate_slippage(request.slippage_bps)?;
        if request.amount == 0 {
            return Err(PositionError::InvalidAmount("deposit amount must be positive".to_string()));
        }
        let ticks = resolve_tick_range(
            &request.range,
            pool.token_a.decimals,
            pool.token_b.decimals,
            pool.tick_spacing,
        )?;
        let quote = quote_deposit(pool, ticks, request.input, request.amount, request.slippage_bps)?;
        let increase = WhirlpoolOp::IncreaseLiquidity {
            liquidity: quote.liquidity,
            token_max_a: quote.token_max_a,
            token_max_b: quote.token_max_b,
        };

        let (ops, accounts, existing, identity) =
            match resolve_ticks(&request.wallet, pool, ticks, wallet_positions) {
                Resolution::Existing(position) => {
                    self.check_fresh(pool, &position)?;
                    let accounts = self.accounts_for(pool, &request.wallet, &position);
                    let identity = PositionIdentity {
                        address: position.address,
                        position_mint: position.position_mint,
                        tick_range: ticks,
                        is_new: false,
                    };
                    (vec![increase], accounts, Some(position), identity)
                }
                Resolution::New(ticks) => {
                    let accounts = PositionAccounts::derive(
                        &self.ctx.program_id,
                        pool,
                        &request.wallet,
                        new_position_mint,
                        ticks,
                    );
                    let identity = PositionIdentity {
                        address: accounts.position,
                        position_mint: *new_position_mint,
                        tick_range: ticks,
                        is_new: true,
                    };
                    let open = WhirlpoolOp::OpenPosition {
                        tick_lower: ticks.tick_lower,
                        tick_upper: ticks.tick_upper,
                    };
                    (vec![open, increase], accounts, None, identity)
                }
            };

        validate_ops(&ops, existing.as_ref())?;
        let plan = InstructionPlan::new(PlanAction::Deposit, ops, accounts);
        info!(
            "Composed deposit plan {}: {:?} into ticks [{}, {}] (new position: {})",
            plan.id,
            plan.op_names(),
            ticks.tick_lower,
            ticks.tick_upper,
            identity.is_new
        );
        Ok(DepositPlan { plan, position: identity, quote })
    }

    pub fn compose_withdraw(
        &self,
        pool: &PoolSnapshot,
        wallet: &Pubkey,
        position: &Position,
        amount: WithdrawAmount,
        slippage_bps: u16,
    ) -> ComposeResult<WithdrawPlan> {
        self.check_ownership(wallet, pool, position)?;
        self.check_fresh(pool, position)?;
        validate_slippage(slippage_bps)?;
        if position.liquidity == 0 {
            return Err(PositionError::InvalidAmount(format!(
                "position {} holds no liquidity to withdraw",
                position.address
            )));
        }
        let liquidity = match amount {
            WithdrawAmount::Percentage(percentage) => liquidity_for_percentage(position, percentage)?,
            WithdrawAmount::Liquidity(liquidity) => liquidity,
        };
        let quote = quote_withdraw(pool, position, liquidity, slippage_bps)?;

        let ops = vec![WhirlpoolOp::DecreaseLiquidity {
            liquidity: quote.liquidity,
            token_min_a: quote.token_min_a,
            token_min_b: quote.token_min_b,
        }];
        validate_ops(&ops, Some(position))?;
        let plan = InstructionPlan::new(PlanAction::Withdraw, ops, self.accounts_for(pool, wallet, position));
        info!(
            "Composed withdraw plan {}: {} of {} liquidity from {}",
            plan.id, quote.liquidity, position.liquidity, position.address
        );
        Ok(WithdrawPlan { plan, quote })
    }

    pub fn compose_collect(
        &self,
        pool: &PoolSnapshot,
        wallet: &Pubkey,
        position: &Position,
    ) -> ComposeResult<InstructionPlan> {
        self.check_ownership(wallet, pool, position)?;
        self.check_fresh(pool, position)?;

        // Nothing accrues to a position without liquidity, so its owed fees are
        // already final and collect skips the refresh.
        let ops = if position.liquidity > 0 {
            vec![WhirlpoolOp::UpdateFeesAndRewards, WhirlpoolOp::CollectFees]
        } else if position.has_fees_owed() {
            vec![WhirlpoolOp::CollectFees]
        } else {
            return Err(PositionError::InvalidAmount(format!(
                "position {} has no liquidity and no fees owed",
                position.address
            )));
        };
        validate_ops(&ops, Some(position))?;
        let plan = InstructionPlan::new(PlanAction::Collect, ops, self.accounts_for(pool, wallet, position));
        info!("Composed collect plan {}: {:?}", plan.id, plan.op_names());
        Ok(plan)
    }

    pub fn compose_close(
        &self,
        pool: &PoolSnapshot,
        wallet: &Pubkey,
        position: &Position,
        slippage_bps: u16,
    ) -> ComposeResult<(InstructionPlan, Option<WithdrawQuote>)> {
        self.check_ownership(wallet, pool, position)?;
        self.check_fresh(pool, position)?;
        validate_slippage(slippage_bps)?;

        let (ops, quote) = if position.liquidity > 0 {
            let quote = quote_withdraw(pool, position, position.liquidity, slippage_bps)?;
            let ops = vec![
                WhirlpoolOp::UpdateFeesAndRewards,
                WhirlpoolOp::DecreaseLiquidity {
                    liquidity: quote.liquidity,
                    token_min_a: quote.token_min_a,
                    token_min_b: quote.token_min_b,
                },
                WhirlpoolOp::UpdateFeesAndRewards,
                WhirlpoolOp::CollectFees,
                WhirlpoolOp::ClosePosition,
            ];
            (ops, Some(quote))
        } else if position.has_fees_owed() {
            (vec![WhirlpoolOp::CollectFees, WhirlpoolOp::ClosePosition], None)
        } else {
            (vec![WhirlpoolOp::ClosePosition], None)
        };

        validate_ops(&ops, Some(position))?;
        let plan = InstructionPlan::new(PlanAction::Close, ops, self.accounts_for(pool, wallet, position));
        info!(
            "Composed close plan {} for {}: {:?}",
            plan.id,
            position.address,
            plan.op_names()
        );
        Ok((plan, quote))
    }
}
