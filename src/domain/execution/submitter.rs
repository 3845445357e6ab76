use async_trait::async_trait;
use serde::Serialize;

use super::lifecycle::TransactionLifecycle;
use crate::shared::errors::PositionError;

/// Final outcome reported by a chain submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub signature: String,
    /// False when the transaction landed but the program rejected it
    pub confirmed: bool,
    pub error: Option<String>,
}

/// Signs, broadcasts and confirms a built transaction
///
/// A confirmation timeout must surface as `ConfirmationTimeout`; callers never
/// resubmit on their own.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    async fn submit(&self, transaction: Vec<u8>) -> Result<SubmissionOutcome, PositionError>;

    /// Submit while reporting progress; the default only sees the final outcome.
    async fn submit_with_progress(
        &self,
        transaction: Vec<u8>,
        _lifecycle: &TransactionLifecycle,
    ) -> Result<SubmissionOutcome, PositionError> {
        self.submit(transaction).await
    }
}
