//! Solana chain adapters for the Whirlpool program

pub mod chain_submitter;
pub mod pool_source;
pub mod position_source;
pub mod price_oracle;
pub mod rpc_client;
pub mod whirlpool_accounts;

pub use chain_submitter::{RpcChainSubmitter, SubmitterConfig};
pub use pool_source::RpcPoolSource;
pub use position_source::{build_position_source, IndexerPositionSource, RpcPositionSource};
pub use price_oracle::StaticPriceOracle;
pub use rpc_client::{parse_commitment, SolanaRpcClient};
