//! Error handling for the engine and the application shell

use thiserror::Error;

/// Stable tag for every engine failure, suitable for UI branching and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRange,
    InvalidAmount,
    PositionNotFound,
    InsufficientLiquidity,
    PositionNotEmpty,
    StaleSnapshot,
    SubmissionFailure,
    ConfirmationTimeout,
    MathOverflow,
    Chain,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRange => "invalid_range",
            ErrorKind::InvalidAmount => "invalid_amount",
            ErrorKind::PositionNotFound => "position_not_found",
            ErrorKind::InsufficientLiquidity => "insufficient_liquidity",
            ErrorKind::PositionNotEmpty => "position_not_empty",
            ErrorKind::StaleSnapshot => "stale_snapshot",
            ErrorKind::SubmissionFailure => "submission_failure",
            ErrorKind::ConfirmationTimeout => "confirmation_timeout",
            ErrorKind::MathOverflow => "math_overflow",
            ErrorKind::Chain => "chain",
        }
    }
}

/// Position engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: u128, available: u128 },

    #[error("Position still holds {liquidity} liquidity and cannot be closed")]
    PositionNotEmpty { liquidity: u128 },

    #[error("Stale snapshot: {0}. Re-fetch pool and position state before retrying")]
    StaleSnapshot(String),

    #[error("Submission failed: {0}")]
    SubmissionFailure(String),

    #[error("Confirmation of {signature} timed out after {timeout_secs}s; the transaction may still land")]
    ConfirmationTimeout { signature: String, timeout_secs: u64 },

    #[error("Math overflow: {0}")]
    MathOverflow(String),

    #[error("Chain error: {0}")]
    Chain(String),
}

impl PositionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PositionError::InvalidRange(_) => ErrorKind::InvalidRange,
            PositionError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            PositionError::PositionNotFound(_) => ErrorKind::PositionNotFound,
            PositionError::InsufficientLiquidity { .. } => ErrorKind::InsufficientLiquidity,
            PositionError::PositionNotEmpty { .. } => ErrorKind::PositionNotEmpty,
            PositionError::StaleSnapshot(_) => ErrorKind::StaleSnapshot,
            PositionError::SubmissionFailure(_) => ErrorKind::SubmissionFailure,
            PositionError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            PositionError::MathOverflow(_) => ErrorKind::MathOverflow,
            PositionError::Chain(_) => ErrorKind::Chain,
        }
    }

    /// The caller should re-fetch chain state and may then retry.
    pub fn is_retryable_after_refetch(&self) -> bool {
        matches!(self, PositionError::StaleSnapshot(_))
    }

    /// The transaction may or may not have landed. Never resubmit blindly.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, PositionError::ConfirmationTimeout { .. })
    }

    /// Rejected before any instruction was composed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidRange
                | ErrorKind::InvalidAmount
                | ErrorKind::PositionNotFound
                | ErrorKind::InsufficientLiquidity
                | ErrorKind::PositionNotEmpty
                | ErrorKind::StaleSnapshot
        )
    }
}

/// Result returned across every compose boundary
pub type ComposeResult<T> = Result<T, PositionError>;

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Wallet error: {0}")]
    WalletError(String),

    #[error(transparent)]
    Position(#[from] PositionError),
}
