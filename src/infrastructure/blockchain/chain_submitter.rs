//! Signs, sends and confirms built transactions over RPC

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tracing::{error, info, warn};

use super::rpc_client::SolanaRpcClient;
use crate::domain::execution::{ChainSubmitter, LifecycleState, SubmissionOutcome, TransactionLifecycle};
use crate::shared::errors::PositionError;

#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Chain submitter backed by the wallet keypair
///
/// Sends exactly once. A confirmation timeout is reported as-is; the transaction
/// may still land.
pub struct RpcChainSubmitter {
    rpc: SolanaRpcClient,
    wallet: Arc<Keypair>,
    config: SubmitterConfig,
}

impl RpcChainSubmitter {
    pub fn new(rpc: SolanaRpcClient, wallet: Arc<Keypair>, config: SubmitterConfig) -> Self {
        Self { rpc, wallet, config }
    }

    fn sign(&self, bytes: &[u8]) -> Result<Transaction, PositionError> {
        let mut transaction: Transaction = bincode::deserialize(bytes)
            .map_err(|e| PositionError::SubmissionFailure(format!("Invalid transaction bytes: {}", e)))?;
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[self.wallet.as_ref()], blockhash)
            .map_err(|e| PositionError::SubmissionFailure(format!("Failed to sign transaction: {}", e)))?;
        if !transaction.is_signed() {
            return Err(PositionError::SubmissionFailure(
                "transaction is missing required signatures".to_string(),
            ));
        }
        Ok(transaction)
    }

    async fn wait_for_confirmation(&self, signature: &Signature) -> Result<SubmissionOutcome, PositionError> {
        let poll = async {
            loop {
                match self.rpc.inner().get_signature_status(signature).await {
                    Ok(Some(Ok(()))) => {
                        return SubmissionOutcome {
                            signature: signature.to_string(),
                            confirmed: true,
                            error: None,
                        }
                    }
                    Ok(Some(Err(e))) => {
                        return SubmissionOutcome {
                            signature: signature.to_string(),
                            confirmed: false,
                            error: Some(e.to_string()),
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Signature status poll failed for {}: {}", signature, e),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };
        tokio::time::timeout(self.config.confirmation_timeout, poll)
            .await
            .map_err(|_| PositionError::ConfirmationTimeout {
                signature: signature.to_string(),
                timeout_secs: self.config.confirmation_timeout.as_secs(),
            })
    }

    async fn send_and_confirm(
        &self,
        transaction: Vec<u8>,
        lifecycle: Option<&TransactionLifecycle>,
    ) -> Result<SubmissionOutcome, PositionError> {
        let transaction = self.sign(&transaction)?;
        let signature = self
            .rpc
            .inner()
            .send_transaction(&transaction)
            .await
            .map_err(|e| PositionError::SubmissionFailure(format!("Failed to send transaction: {}", e)))?;
        info!("📤 Sent transaction {}", signature);
        if let Some(lifecycle) = lifecycle {
            if let Err(e) = lifecycle.advance(LifecycleState::Confirming) {
                warn!("{}", e);
            }
        }

        let outcome = self.wait_for_confirmation(&signature).await?;
        if outcome.confirmed {
            info!("✅ Transaction {} confirmed", signature);
        } else {
            error!(
                "❌ Transaction {} failed on chain: {}",
                signature,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(outcome)
    }
}

#[async_trait]
impl ChainSubmitter for RpcChainSubmitter {
    async fn submit(&self, transaction: Vec<u8>) -> Result<SubmissionOutcome, PositionError> {
        self.send_and_confirm(transaction, None).await
    }

    async fn submit_with_progress(
        &self,
        transaction: Vec<u8>,
        lifecycle: &TransactionLifecycle,
    ) -> Result<SubmissionOutcome, PositionError> {
        self.send_and_confirm(transaction, Some(lifecycle)).await
    }
}
