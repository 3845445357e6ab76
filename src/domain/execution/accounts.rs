//! Whirlpool program addresses and the account set a position instruction touches

use serde::Serialize;
use solana_sdk::{pubkey, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address;

use crate::domain::tick::{tick_array_start_index, TickRange};
use crate::shared::types::{pubkey_string, PoolSnapshot};

pub const WHIRLPOOL_PROGRAM_ID: Pubkey = pubkey!("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc");

const POSITION_SEED: &[u8] = b"position";
const TICK_ARRAY_SEED: &[u8] = b"tick_array";

/// Position PDA and bump for a position mint
pub fn position_address(program_id: &Pubkey, position_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POSITION_SEED, position_mint.as_ref()], program_id)
}

/// Tick array PDA for the array starting at `start_index`
pub fn tick_array_address(program_id: &Pubkey, whirlpool: &Pubkey, start_index: i32) -> Pubkey {
    let start = start_index.to_string();
    Pubkey::find_program_address(
        &[TICK_ARRAY_SEED, whirlpool.as_ref(), start.as_bytes()],
        program_id,
    )
    .0
}

/// Every account any position instruction may reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionAccounts {
    #[serde(with = "pubkey_string")]
    pub whirlpool: Pubkey,
    #[serde(with = "pubkey_string")]
    pub owner: Pubkey,
    #[serde(with = "pubkey_string")]
    pub position: Pubkey,
    pub position_bump: u8,
    #[serde(with = "pubkey_string")]
    pub position_mint: Pubkey,
    #[serde(with = "pubkey_string")]
    pub position_token_account: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_owner_account_a: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_owner_account_b: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_vault_a: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_vault_b: Pubkey,
    #[serde(with = "pubkey_string")]
    pub tick_array_lower: Pubkey,
    #[serde(with = "pubkey_string")]
    pub tick_array_upper: Pubkey,
}

impl PositionAccounts {
    pub fn derive(
        program_id: &Pubkey,
        pool: &PoolSnapshot,
        owner: &Pubkey,
        position_mint: &Pubkey,
        ticks: TickRange,
    ) -> Self {
        let (position, position_bump) = position_address(program_id, position_mint);
        let lower_start = tick_array_start_index(ticks.tick_lower, pool.tick_spacing);
        let upper_start = tick_array_start_index(ticks.tick_upper, pool.tick_spacing);
        Self {
            whirlpool: pool.address,
            owner: *owner,
            position,
            position_bump,
            position_mint: *position_mint,
            position_token_account: get_associated_token_address(owner, position_mint),
            token_owner_account_a: get_associated_token_address(owner, &pool.token_a.mint),
            token_owner_account_b: get_associated_token_address(owner, &pool.token_b.mint),
            token_vault_a: pool.token_a.vault,
            token_vault_b: pool.token_b.vault,
            tick_array_lower: tick_array_address(program_id, &pool.address, lower_start),
            tick_array_upper: tick_array_address(program_id, &pool.address, upper_start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{sample_pool, wallet};

    #[test]
    fn test_position_address_is_stable() {
        let mint = Pubkey::new_from_array([3; 32]);
        let first = position_address(&WHIRLPOOL_PROGRAM_ID, &mint);
        let second = position_address(&WHIRLPOOL_PROGRAM_ID, &mint);
        assert_eq!(first, second);
        assert_ne!(first.0, mint);
    }

    #[test]
    fn test_tick_arrays_shared_inside_one_array() {
        let pool = sample_pool(126.0);
        let mint = Pubkey::new_from_array([3; 32]);
        let narrow = TickRange { tick_lower: -20736, tick_upper: -20672 };
        let accounts = PositionAccounts::derive(&WHIRLPOOL_PROGRAM_ID, &pool, &wallet(), &mint, narrow);
        assert_eq!(accounts.tick_array_lower, accounts.tick_array_upper);

        let wide = TickRange { tick_lower: -22528, tick_upper: -11264 };
        let accounts = PositionAccounts::derive(&WHIRLPOOL_PROGRAM_ID, &pool, &wallet(), &mint, wide);
        assert_ne!(accounts.tick_array_lower, accounts.tick_array_upper);
        assert_eq!(
            accounts.position_token_account,
            get_associated_token_address(&wallet(), &mint)
        );
    }
}
