//! Position sources: direct program scan over RPC or an HTTP indexer

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use tracing::{debug, info, warn};

use super::rpc_client::SolanaRpcClient;
use super::whirlpool_accounts::{
    token_account_amount, token_account_owner, PositionAccount, POSITION_ACCOUNT_LEN,
    POSITION_WHIRLPOOL_OFFSET,
};
use crate::domain::position::PositionSource;
use crate::shared::config::{PositionSourceKind, PositionsCfg};
use crate::shared::errors::{AppError, PositionError};
use crate::shared::types::Position;

/// Scans the Whirlpool program for position accounts and confirms ownership
/// through the holder's position NFT token account.
pub struct RpcPositionSource {
    rpc: SolanaRpcClient,
    program_id: Pubkey,
}

impl RpcPositionSource {
    pub fn new(rpc: SolanaRpcClient, program_id: Pubkey) -> Self {
        Self { rpc, program_id }
    }
}

#[async_trait]
impl PositionSource for RpcPositionSource {
    fn name(&self) -> &'static str {
        "rpc"
    }

    async fn positions_for_owner(&self, owner: &Pubkey, whirlpool: &Pubkey) -> Result<Vec<Position>, PositionError> {
        let filters = vec![
            RpcFilterType::DataSize(POSITION_ACCOUNT_LEN as u64),
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(POSITION_WHIRLPOOL_OFFSET, whirlpool.as_ref())),
        ];
        let raw = self.rpc.get_program_accounts(&self.program_id, filters).await?;
        let mut decoded = Vec::with_capacity(raw.len());
        for (address, account) in raw {
            match PositionAccount::decode(&account.data) {
                Ok(position) => decoded.push((address, position)),
                Err(e) => warn!("Skipping undecodable position {}: {}", address, e),
            }
        }

        let token_accounts: Vec<Pubkey> = decoded
            .iter()
            .map(|(_, position)| get_associated_token_address(owner, &position.position_mint))
            .collect();
        let (holders, slot) = self.rpc.get_multiple_accounts(&token_accounts).await?;

        let mut positions = Vec::new();
        for ((address, position), holder) in decoded.into_iter().zip(holders) {
            let Some(holder) = holder else { continue };
            if token_account_amount(&holder.data)? == 1 && token_account_owner(&holder.data)? == *owner {
                positions.push(position.into_position(address, *owner, slot));
            }
        }
        info!(
            "🔍 Found {} positions for {} in {} at slot {}",
            positions.len(),
            owner,
            whirlpool,
            slot
        );
        Ok(positions)
    }

    async fn position(&self, address: &Pubkey) -> Result<Option<Position>, PositionError> {
        let (accounts, _) = self.rpc.get_multiple_accounts(&[*address]).await?;
        let Some(account) = accounts.into_iter().next().flatten() else {
            return Ok(None);
        };
        let decoded = PositionAccount::decode(&account.data)?;

        let Some(holder) = self.rpc.nft_holder_account(&decoded.position_mint).await? else {
            debug!("Position {} has no NFT holder", address);
            return Ok(None);
        };
        let (holders, slot) = self.rpc.get_multiple_accounts(&[holder]).await?;
        let Some(holder) = holders.into_iter().next().flatten() else {
            return Ok(None);
        };
        let owner = token_account_owner(&holder.data)?;
        Ok(Some(decoded.into_position(*address, owner, slot)))
    }
}

/// Position record served by the indexer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedPosition {
    pub address: String,
    pub position_mint: String,
    pub whirlpool: String,
    pub owner: String,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    /// Decimal string, u128 does not survive JSON numbers
    pub liquidity: String,
    #[serde(default)]
    pub fee_owed_a: u64,
    #[serde(default)]
    pub fee_owed_b: u64,
    #[serde(default)]
    pub slot: u64,
}

impl TryFrom<IndexedPosition> for Position {
    type Error = PositionError;

    fn try_from(record: IndexedPosition) -> Result<Self, Self::Error> {
        let key = |value: &str| -> Result<Pubkey, PositionError> {
            value
                .parse()
                .map_err(|e| PositionError::Chain(format!("indexer returned invalid key {}: {}", value, e)))
        };
        Ok(Position {
            address: key(&record.address)?,
            position_mint: key(&record.position_mint)?,
            whirlpool: key(&record.whirlpool)?,
            owner: key(&record.owner)?,
            tick_lower_index: record.tick_lower_index,
            tick_upper_index: record.tick_upper_index,
            liquidity: record.liquidity.parse().map_err(|e| {
                PositionError::Chain(format!("indexer returned invalid liquidity {}: {}", record.liquidity, e))
            })?,
            fee_owed_a: record.fee_owed_a,
            fee_owed_b: record.fee_owed_b,
            slot: record.slot,
        })
    }
}

/// Reads positions from an HTTP JSON indexer
pub struct IndexerPositionSource {
    client: reqwest::Client,
    base_url: String,
}

impl IndexerPositionSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<Option<T>, PositionError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PositionError::Chain(format!("Indexer request failed: {}", e)))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| PositionError::Chain(format!("Indexer returned error: {}", e)))?;
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| PositionError::Chain(format!("Invalid indexer response: {}", e)))
    }
}

#[async_trait]
impl PositionSource for IndexerPositionSource {
    fn name(&self) -> &'static str {
        "indexer"
    }

    async fn positions_for_owner(&self, owner: &Pubkey, whirlpool: &Pubkey) -> Result<Vec<Position>, PositionError> {
        let url = format!("{}/positions?owner={}&whirlpool={}", self.base_url, owner, whirlpool);
        let records: Vec<IndexedPosition> = self.get(url).await?.unwrap_or_default();
        let positions = records
            .into_iter()
            .map(Position::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // Only what the indexer attributes to this owner and pool
        Ok(positions
            .into_iter()
            .filter(|p| p.owner == *owner && p.whirlpool == *whirlpool)
            .collect())
    }

    async fn position(&self, address: &Pubkey) -> Result<Option<Position>, PositionError> {
        let url = format!("{}/positions/{}", self.base_url, address);
        match self.get::<IndexedPosition>(url).await? {
            Some(record) => Ok(Some(record.try_into()?)),
            None => Ok(None),
        }
    }
}

/// Position source selected by the `[positions]` config section
pub fn build_position_source(
    cfg: &PositionsCfg,
    rpc: SolanaRpcClient,
    program_id: Pubkey,
) -> Result<Arc<dyn PositionSource>, AppError> {
    match cfg.source {
        PositionSourceKind::Rpc => Ok(Arc::new(RpcPositionSource::new(rpc, program_id))),
        PositionSourceKind::Indexer => {
            let url = cfg
                .indexer_url
                .clone()
                .ok_or_else(|| AppError::ConfigError("positions.indexer_url is not set".to_string()))?;
            Ok(Arc::new(IndexerPositionSource::new(url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::commitment_config::CommitmentConfig;

    #[test]
    fn test_indexed_position_conversion() {
        let owner = Pubkey::new_unique();
        let json = format!(
            r#"{{"address":"{}","positionMint":"{}","whirlpool":"{}","owner":"{}",
               "tickLowerIndex":-20736,"tickUpperIndex":-20672,
               "liquidity":"340282366920938463463374607431768211455","feeOwedA":3,"slot":9}}"#,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            owner
        );
        let record: IndexedPosition = serde_json::from_str(&json).unwrap();
        let position = Position::try_from(record).unwrap();
        assert_eq!(position.owner, owner);
        assert_eq!(position.liquidity, u128::MAX);
        assert_eq!(position.fee_owed_a, 3);
        assert_eq!(position.fee_owed_b, 0);
        assert_eq!(position.slot, 9);
    }

    #[test]
    fn test_indexed_position_rejects_bad_keys() {
        let record = IndexedPosition {
            address: "not-a-key".to_string(),
            position_mint: Pubkey::new_unique().to_string(),
            whirlpool: Pubkey::new_unique().to_string(),
            owner: Pubkey::new_unique().to_string(),
            tick_lower_index: 0,
            tick_upper_index: 64,
            liquidity: "1".to_string(),
            fee_owed_a: 0,
            fee_owed_b: 0,
            slot: 0,
        };
        assert!(matches!(Position::try_from(record), Err(PositionError::Chain(_))));
    }

    #[test]
    fn test_factory_selects_source() {
        let rpc = SolanaRpcClient::new("http://localhost:8899".to_string(), CommitmentConfig::confirmed());
        let program = Pubkey::new_unique();

        let source = build_position_source(&PositionsCfg::default(), rpc.clone(), program).unwrap();
        assert_eq!(source.name(), "rpc");

        let indexer = PositionsCfg {
            source: PositionSourceKind::Indexer,
            indexer_url: Some("http://localhost:3000/".to_string()),
        };
        assert_eq!(build_position_source(&indexer, rpc.clone(), program).unwrap().name(), "indexer");

        let missing = PositionsCfg { source: PositionSourceKind::Indexer, indexer_url: None };
        assert!(build_position_source(&missing, rpc, program).is_err());
    }
}
