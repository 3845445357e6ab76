//! Whirlpool position operations and their instruction encoding
//!
//! Instruction data is the Anchor sighash (`sha256("global:<name>")[..8]`)
//! followed by the borsh encoded arguments.

use borsh::BorshSerialize;
use serde::Serialize;
use solana_sdk::{
    hash::hashv,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use super::accounts::PositionAccounts;
use crate::shared::errors::{ComposeResult, PositionError};

/// One step of a position action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WhirlpoolOp {
    OpenPosition { tick_lower: i32, tick_upper: i32 },
    IncreaseLiquidity { liquidity: u128, token_max_a: u64, token_max_b: u64 },
    DecreaseLiquidity { liquidity: u128, token_min_a: u64, token_min_b: u64 },
    UpdateFeesAndRewards,
    CollectFees,
    ClosePosition,
}

#[derive(BorshSerialize)]
struct OpenPositionArgs {
    position_bump: u8,
    tick_lower_index: i32,
    tick_upper_index: i32,
}

#[derive(BorshSerialize)]
struct ModifyLiquidityArgs {
    liquidity_amount: u128,
    token_threshold_a: u64,
    token_threshold_b: u64,
}

/// 8-byte Anchor instruction discriminator
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let preimage = format!("global:{}", name);
    let hash = hashv(&[preimage.as_bytes()]);
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash.to_bytes()[..8]);
    discriminator
}

fn encode<T: BorshSerialize>(name: &str, args: Option<T>) -> ComposeResult<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    if let Some(args) = args {
        let encoded = args
            .try_to_vec()
            .map_err(|e| PositionError::Chain(format!("failed to encode {} args: {}", name, e)))?;
        data.extend_from_slice(&encoded);
    }
    Ok(data)
}

impl WhirlpoolOp {
    /// Program instruction name
    pub fn name(&self) -> &'static str {
        match self {
            WhirlpoolOp::OpenPosition { .. } => "open_position",
            WhirlpoolOp::IncreaseLiquidity { .. } => "increase_liquidity",
            WhirlpoolOp::DecreaseLiquidity { .. } => "decrease_liquidity",
            WhirlpoolOp::UpdateFeesAndRewards => "update_fees_and_rewards",
            WhirlpoolOp::CollectFees => "collect_fees",
            WhirlpoolOp::ClosePosition => "close_position",
        }
    }

    pub fn data(&self, accounts: &PositionAccounts) -> ComposeResult<Vec<u8>> {
        match *self {
            WhirlpoolOp::OpenPosition { tick_lower, tick_upper } => encode(
                self.name(),
                Some(OpenPositionArgs {
                    position_bump: accounts.position_bump,
                    tick_lower_index: tick_lower,
                    tick_upper_index: tick_upper,
                }),
            ),
            WhirlpoolOp::IncreaseLiquidity { liquidity, token_max_a, token_max_b } => encode(
                self.name(),
                Some(ModifyLiquidityArgs {
                    liquidity_amount: liquidity,
                    token_threshold_a: token_max_a,
                    token_threshold_b: token_max_b,
                }),
            ),
            WhirlpoolOp::DecreaseLiquidity { liquidity, token_min_a, token_min_b } => encode(
                self.name(),
                Some(ModifyLiquidityArgs {
                    liquidity_amount: liquidity,
                    token_threshold_a: token_min_a,
                    token_threshold_b: token_min_b,
                }),
            ),
            _ => encode::<ModifyLiquidityArgs>(self.name(), None),
        }
    }

    /// Account metas in program order
    pub fn account_metas(&self, accounts: &PositionAccounts) -> Vec<AccountMeta> {
        let a = accounts;
        match self {
            WhirlpoolOp::OpenPosition { .. } => vec![
                AccountMeta::new(a.owner, true),
                AccountMeta::new_readonly(a.owner, false),
                AccountMeta::new(a.position, false),
                AccountMeta::new(a.position_mint, true),
                AccountMeta::new(a.position_token_account, false),
                AccountMeta::new_readonly(a.whirlpool, false),
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new_readonly(system_program::id(), false),
                AccountMeta::new_readonly(sysvar::rent::id(), false),
                AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            ],
            WhirlpoolOp::IncreaseLiquidity { .. } | WhirlpoolOp::DecreaseLiquidity { .. } => vec![
                AccountMeta::new(a.whirlpool, false),
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new_readonly(a.owner, true),
                AccountMeta::new(a.position, false),
                AccountMeta::new_readonly(a.position_token_account, false),
                AccountMeta::new(a.token_owner_account_a, false),
                AccountMeta::new(a.token_owner_account_b, false),
                AccountMeta::new(a.token_vault_a, false),
                AccountMeta::new(a.token_vault_b, false),
                AccountMeta::new(a.tick_array_lower, false),
                AccountMeta::new(a.tick_array_upper, false),
            ],
            WhirlpoolOp::UpdateFeesAndRewards => vec![
                AccountMeta::new(a.whirlpool, false),
                AccountMeta::new(a.position, false),
                AccountMeta::new_readonly(a.tick_array_lower, false),
                AccountMeta::new_readonly(a.tick_array_upper, false),
            ],
            WhirlpoolOp::CollectFees => vec![
                AccountMeta::new_readonly(a.whirlpool, false),
                AccountMeta::new_readonly(a.owner, true),
                AccountMeta::new(a.position, false),
                AccountMeta::new_readonly(a.position_token_account, false),
                AccountMeta::new(a.token_owner_account_a, false),
                AccountMeta::new(a.token_vault_a, false),
                AccountMeta::new(a.token_owner_account_b, false),
                AccountMeta::new(a.token_vault_b, false),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            WhirlpoolOp::ClosePosition => vec![
                AccountMeta::new_readonly(a.owner, true),
                AccountMeta::new(a.owner, false),
                AccountMeta::new(a.position, false),
                AccountMeta::new(a.position_mint, false),
                AccountMeta::new(a.position_token_account, false),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
        }
    }

    pub fn to_instruction(&self, program_id: &Pubkey, accounts: &PositionAccounts) -> ComposeResult<Instruction> {
        Ok(Instruction {
            program_id: *program_id,
            accounts: self.account_metas(accounts),
            data: self.data(accounts)?,
        })
    }
}
