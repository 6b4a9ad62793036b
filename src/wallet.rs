//! Wallet Service Boundary
//!
//! The core never moves value itself; it asks the wallet collaborator to.
//! One wallet call per logical attempt, always made while the record lock
//! is held, so duplicate triggers can never fan out into duplicate
//! transfers.

use async_trait::async_trait;
use thiserror::Error;

use crate::core_types::{PartyId, Sats};

/// Wallet collaborator failures.
///
/// These are infrastructure problems. A wallet that executed the request
/// and said no answers through [`TransferOutcome::Rejected`] instead.
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("wallet backend unavailable: {0}")]
    Unavailable(String),

    #[error("unknown party: {0}")]
    UnknownParty(PartyId),
}

/// One requested balance movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    pub from: PartyId,
    pub to: PartyId,
    pub amount: Sats,
    pub memo: Option<String>,
}

/// What the wallet did with a transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Funds moved; `reference` is the wallet's identifier for the movement
    Completed { reference: String },
    /// The wallet declined and no funds moved
    Rejected { reason: String },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }
}

/// Balance service the coordination core delegates to
#[async_trait]
pub trait WalletService: Send + Sync {
    /// Current spendable balance of a party.
    async fn balance(&self, party: PartyId) -> Result<Sats, WalletError>;

    /// Move funds between two parties.
    ///
    /// Must be all-or-nothing: on `Rejected` (and on `Err`) no balance
    /// may have changed.
    async fn transfer(&self, spec: TransferSpec) -> Result<TransferOutcome, WalletError>;
}


#[cfg(test)]
pub use mock::MockWallet;
