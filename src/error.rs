//! Coordination Error Types
//!
//! One taxonomy for every operation on coordinated records. Callers route
//! on the variant; `code()` gives a stable string for logs and surfaces.

use thiserror::Error;

use crate::storage::StorageError;
use crate::wallet::WalletError;

/// Errors reported by record operations
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    // === Lookup & locking ===
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("timed out waiting for record lock: {0}")]
    LockTimeout(String),

    #[error("record is no longer active: {0}")]
    AlreadyTerminal(String),

    // === Authorization ===
    #[error("requester is not authorized for this record")]
    Forbidden,

    #[error("source and recipient cannot be the same party")]
    SelfTransfer,

    // === Validation ===
    #[error("amount must be at least 1")]
    InvalidAmount,

    #[error("share must be at least 1 and divide the capacity evenly")]
    InvalidShare,

    #[error("insufficient balance")]
    InsufficientFunds,

    // === Execution ===
    #[error("pool is exhausted: {0}")]
    Exhausted(String),

    #[error("wallet refused the transfer: {0}")]
    TransferFailed(String),

    // === Infrastructure ===
    #[error("storage error: {0}")]
    Storage(String),

    #[error("wallet service error: {0}")]
    Wallet(String),
}

impl CoreError {
    /// Get the stable error code for logs and caller-facing surfaces
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::LockTimeout(_) => "LOCK_TIMEOUT",
            CoreError::AlreadyTerminal(_) => "ALREADY_TERMINAL",
            CoreError::Forbidden => "FORBIDDEN",
            CoreError::SelfTransfer => "SELF_TRANSFER",
            CoreError::InvalidAmount => "INVALID_AMOUNT",
            CoreError::InvalidShare => "INVALID_SHARE",
            CoreError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            CoreError::Exhausted(_) => "EXHAUSTED",
            CoreError::TransferFailed(_) => "TRANSFER_FAILED",
            CoreError::Storage(_) => "STORAGE_ERROR",
            CoreError::Wallet(_) => "WALLET_ERROR",
        }
    }

    /// True for outcomes a caller may retry on the same record.
    ///
    /// Everything else is either final for the record or a bug in the
    /// request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::LockTimeout(_)
                | CoreError::InsufficientFunds
                | CoreError::Storage(_)
                | CoreError::Wallet(_)
        )
    }
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<WalletError> for CoreError {
    fn from(e: WalletError) -> Self {
        CoreError::Wallet(e.to_string())
    }
}
