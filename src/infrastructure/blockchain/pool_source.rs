//! Whirlpool state read straight from RPC

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey};
use tracing::{debug, info};

use super::rpc_client::SolanaRpcClient;
use super::whirlpool_accounts::{mint_decimals, tick_samples_from_arrays, WhirlpoolAccount};
use crate::domain::distribution::TickSample;
use crate::domain::execution::tick_array_address;
use crate::domain::pool::PoolSource;
use crate::domain::tick::{tick_array_start_index, TICK_ARRAY_SIZE};
use crate::shared::errors::PositionError;
use crate::shared::types::PoolSnapshot;

/// Start indices of the current tick array and `per_side` arrays on either side
pub fn tick_array_starts(pool: &PoolSnapshot, per_side: u8) -> Vec<i32> {
    let span = TICK_ARRAY_SIZE * pool.tick_spacing as i32;
    let current = tick_array_start_index(pool.tick_current_index, pool.tick_spacing);
    let per_side = per_side as i32;
    (-per_side..=per_side).map(|offset| current + offset * span).collect()
}

pub struct RpcPoolSource {
    rpc: SolanaRpcClient,
    program_id: Pubkey,
}

impl RpcPoolSource {
    pub fn new(rpc: SolanaRpcClient, program_id: Pubkey) -> Self {
        Self { rpc, program_id }
    }
}

#[async_trait]
impl PoolSource for RpcPoolSource {
    async fn pool_snapshot(&self, address: &Pubkey) -> Result<PoolSnapshot, PositionError> {
        let (accounts, _) = self.rpc.get_multiple_accounts(&[*address]).await?;
        let data = accounts
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| PositionError::Chain(format!("whirlpool {} not found", address)))?
            .data;
        let whirlpool = WhirlpoolAccount::decode(&data)?;

        let (mints, slot) = self
            .rpc
            .get_multiple_accounts(&[whirlpool.token_mint_a, whirlpool.token_mint_b])
            .await?;
        let decimals = |index: usize| -> Result<u8, PositionError> {
            let mint = mints
                .get(index)
                .cloned()
                .flatten()
                .ok_or_else(|| PositionError::Chain("pool token mint not found".to_string()))?;
            mint_decimals(&mint.data)
        };
        let (decimals_a, decimals_b) = (decimals(0)?, decimals(1)?);

        let snapshot = whirlpool.into_snapshot(*address, decimals_a, decimals_b, slot);
        info!(
            "📊 Pool {} at slot {}: tick {}, price {:.6}",
            address,
            slot,
            snapshot.tick_current_index,
            snapshot.current_price()
        );
        Ok(snapshot)
    }

    async fn tick_samples(&self, pool: &PoolSnapshot, arrays_per_side: u8) -> Result<Vec<TickSample>, PositionError> {
        let addresses: Vec<Pubkey> = tick_array_starts(pool, arrays_per_side)
            .into_iter()
            .map(|start| tick_array_address(&self.program_id, &pool.address, start))
            .collect();
        let (accounts, _) = self.rpc.get_multiple_accounts(&addresses).await?;
        // Uninitialized tick arrays simply do not exist on chain
        let arrays: Vec<Vec<u8>> = accounts.into_iter().flatten().map(|account| account.data).collect();
        debug!("Loaded {}/{} tick arrays for {}", arrays.len(), addresses.len(), pool.address);
        tick_samples_from_arrays(pool, &arrays)
    }

    async fn latest_blockhash(&self) -> Result<Hash, PositionError> {
        self.rpc.get_latest_blockhash().await
    }
}
