use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::shared::errors::PositionError;
use crate::shared::types::Position;

/// Capability for reading a wallet's positions
///
/// Implementations must read fresh state; results are never cached between compose calls.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// All positions in `whirlpool` whose position NFT is held by `owner`
    async fn positions_for_owner(
        &self,
        owner: &Pubkey,
        whirlpool: &Pubkey,
    ) -> Result<Vec<Position>, PositionError>;

    /// A single position by account address, `None` if it does not exist
    async fn position(&self, address: &Pubkey) -> Result<Option<Position>, PositionError>;
}
