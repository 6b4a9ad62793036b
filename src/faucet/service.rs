//! Faucet Service
//!
//! Orchestrates the distribution pool: create, claim, cancel. Every claim
//! runs inside the record lock, makes at most one wallet call, and leaves
//! the pool in a persisted, well-defined state on every exit path.

use std::sync::Arc;

use tracing::{info, warn};

use super::record::{ClaimOutcome, CloseReason, FaucetRecord, FaucetStatus};
use crate::core_types::{PartyId, RecordId, Sats};
use crate::error::CoreError;
use crate::lock::LockCoordinator;
use crate::notify::{Event, NotificationSink};
use crate::storage::{RecordStore, save};
use crate::wallet::{TransferOutcome, TransferSpec, WalletService};

/// Distribution pool orchestrator
#[derive(Clone)]
pub struct FaucetService {
    store: Arc<dyn RecordStore>,
    wallet: Arc<dyn WalletService>,
    notifier: Arc<dyn NotificationSink>,
    locks: Arc<LockCoordinator>,
}

impl FaucetService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        wallet: Arc<dyn WalletService>,
        notifier: Arc<dyn NotificationSink>,
        locks: Arc<LockCoordinator>,
    ) -> Self {
        Self {
            store,
            wallet,
            notifier,
            locks,
        }
    }

    /// Open a new pool funded by `source`.
    ///
    /// Validation runs before anything is persisted: bad capacity, a share
    /// that does not divide it, or a source balance below the full
    /// capacity all fail without leaving a record behind.
    pub async fn create(
        &self,
        source: PartyId,
        capacity: Sats,
        share: Sats,
        memo: Option<String>,
    ) -> Result<FaucetRecord, CoreError> {
        if capacity < 1 {
            return Err(CoreError::InvalidAmount);
        }
        if share < 1 || capacity % share != 0 {
            return Err(CoreError::InvalidShare);
        }
        if self.wallet.balance(source).await? < capacity {
            return Err(CoreError::InsufficientFunds);
        }

        let faucet = FaucetRecord::new(source, capacity, share, memo);
        save(self.store.as_ref(), &faucet).await?;
        info!(
            record_id = %faucet.id(),
            source,
            capacity,
            share,
            shares = faucet.total_shares(),
            "faucet opened"
        );
        Ok(faucet)
    }

    /// Claim one share for `claimant`.
    ///
    /// At most once per claimant: a repeat claim is a quiet
    /// [`ClaimOutcome::AlreadyServed`], not an error. The wallet is called
    /// only after every check has passed, and a wallet failure leaves the
    /// pool exactly as it was.
    pub async fn claim(
        &self,
        id: &RecordId,
        claimant: PartyId,
    ) -> Result<ClaimOutcome, CoreError> {
        let (mut faucet, guard) = self.locks.acquire::<FaucetRecord>(id).await?;

        if !faucet.envelope.active {
            self.locks.release(&mut faucet, guard).await?;
            // A drained pool and a cancelled one answer differently.
            return Err(match faucet.closed {
                Some(CloseReason::Exhausted) => CoreError::Exhausted(id.to_string()),
                _ => CoreError::AlreadyTerminal(id.to_string()),
            });
        }
        if claimant == faucet.source {
            self.locks.release(&mut faucet, guard).await?;
            return Err(CoreError::SelfTransfer);
        }
        if faucet.has_claimed(claimant) {
            self.locks.release(&mut faucet, guard).await?;
            return Ok(ClaimOutcome::AlreadyServed);
        }
        if faucet.is_exhausted() {
            // Leftover short of one share: close now, transfer nothing.
            faucet.close(CloseReason::Exhausted);
            self.locks.release(&mut faucet, guard).await?;
            warn!(record_id = %id, remaining = faucet.remaining, "faucet exhausted before claim");
            self.push_status(&faucet).await;
            return Err(CoreError::Exhausted(id.to_string()));
        }

        let spec = TransferSpec {
            from: faucet.source,
            to: claimant,
            amount: faucet.share,
            memo: faucet.memo.clone(),
        };
        match self.wallet.transfer(spec).await {
            Ok(TransferOutcome::Completed { .. }) => {}
            Ok(TransferOutcome::Rejected { reason }) => {
                self.locks.release(&mut faucet, guard).await?;
                warn!(record_id = %id, claimant, reason = %reason, "faucet share transfer rejected");
                return Err(CoreError::TransferFailed(reason));
            }
            Err(e) => {
                self.locks.release(&mut faucet, guard).await?;
                return Err(e.into());
            }
        }

        faucet.record_claim(claimant);
        if faucet.is_exhausted() {
            faucet.close(CloseReason::Exhausted);
        }
        self.locks.release(&mut faucet, guard).await?;

        info!(
            record_id = %id,
            claimant,
            amount = faucet.share,
            remaining = faucet.remaining,
            served = faucet.served,
            "faucet share served"
        );

        // Claimant hears "received", owner hears "sent"; the sink renders
        // the same receipt differently per recipient.
        let receipt = faucet.claim_receipt(claimant);
        self.notifier
            .notify(claimant, Event::ClaimServed(receipt.clone()))
            .await;
        self.notifier
            .notify(faucet.source, Event::ClaimServed(receipt.clone()))
            .await;
        self.push_status(&faucet).await;

        Ok(ClaimOutcome::Served(receipt))
    }

    /// Shut the pool down early. Owner only.
    ///
    /// Takes no lock: cancellation commutes with a racing claim, and
    /// whichever close lands first decides the recorded reason.
    pub async fn cancel(
        &self,
        id: &RecordId,
        requester: PartyId,
    ) -> Result<FaucetStatus, CoreError> {
        let faucet: FaucetRecord = self.locks.peek(id).await?;
        if requester != faucet.source {
            return Err(CoreError::Forbidden);
        }

        let faucet = self
            .locks
            .deactivate::<FaucetRecord, _>(id, |f| f.close(CloseReason::Cancelled))
            .await?;
        info!(record_id = %id, reason = ?faucet.closed, "faucet closed by owner");

        let status = faucet.status();
        self.push_status(&faucet).await;
        Ok(status)
    }

    /// Current pool snapshot, lock-free.
    pub async fn status(&self, id: &RecordId) -> Result<FaucetStatus, CoreError> {
        let faucet: FaucetRecord = self.locks.peek(id).await?;
        Ok(faucet.status())
    }

    async fn push_status(&self, faucet: &FaucetRecord) {
        self.notifier
            .update_display(faucet.id(), Event::Faucet(faucet.status()))
            .await;
    }
}
