//! Solana RPC client for fresh account reads

use std::sync::Arc;

use futures::future::try_join_all;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::RpcFilterType;
use solana_sdk::{account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey};
use tracing::debug;

use crate::shared::errors::PositionError;

/// `getMultipleAccounts` accepts at most this many keys
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

pub fn parse_commitment(name: &str) -> CommitmentConfig {
    match name {
        "processed" => CommitmentConfig::processed(),
        "finalized" => CommitmentConfig::finalized(),
        _ => CommitmentConfig::confirmed(),
    }
}

fn rpc_error(context: &str, err: impl std::fmt::Display) -> PositionError {
    PositionError::Chain(format!("{}: {}", context, err))
}

/// Solana RPC client wrapper
///
/// Never caches; every call reads at the configured commitment.
#[derive(Clone)]
pub struct SolanaRpcClient {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: String, commitment: CommitmentConfig) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url, commitment)),
            commitment,
        }
    }

    pub fn inner(&self) -> &RpcClient {
        &self.client
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    /// Accounts for `keys` in order plus the newest slot among the chunked reads
    pub async fn get_multiple_accounts(&self, keys: &[Pubkey]) -> Result<(Vec<Option<Account>>, u64), PositionError> {
        let requests = keys.chunks(MAX_MULTIPLE_ACCOUNTS).map(|chunk| async move {
            self.client
                .get_multiple_accounts_with_commitment(chunk, self.commitment)
                .await
                .map_err(|e| rpc_error("Failed to get multiple accounts", e))
        });
        let responses = try_join_all(requests).await?;

        let mut accounts = Vec::with_capacity(keys.len());
        let mut slot = 0;
        for response in responses {
            slot = slot.max(response.context.slot);
            accounts.extend(response.value);
        }
        debug!("Fetched {} accounts at slot {}", keys.len(), slot);
        Ok((accounts, slot))
    }

    /// Program accounts matching every filter
    pub async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<RpcFilterType>,
    ) -> Result<Vec<(Pubkey, Account)>, PositionError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..Default::default()
            },
            ..Default::default()
        };
        self.client
            .get_program_accounts_with_config(program_id, config)
            .await
            .map_err(|e| rpc_error("Failed to get program accounts", e))
    }

    pub async fn get_slot(&self) -> Result<u64, PositionError> {
        self.client
            .get_slot_with_commitment(self.commitment)
            .await
            .map_err(|e| rpc_error("Failed to get slot", e))
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash, PositionError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| rpc_error("Failed to get latest blockhash", e))
    }

    /// Token account currently holding a single-supply mint, if any
    pub async fn nft_holder_account(&self, mint: &Pubkey) -> Result<Option<Pubkey>, PositionError> {
        let largest = self
            .client
            .get_token_largest_accounts(mint)
            .await
            .map_err(|e| rpc_error("Failed to get largest token accounts", e))?;
        Ok(largest
            .into_iter()
            .find(|balance| balance.amount.amount == "1")
            .and_then(|balance| balance.address.parse().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commitment() {
        assert_eq!(parse_commitment("finalized"), CommitmentConfig::finalized());
        assert_eq!(parse_commitment("processed"), CommitmentConfig::processed());
        assert_eq!(parse_commitment("anything"), CommitmentConfig::confirmed());
    }
}
