//! Payment Service
//!
//! Drives a single transfer record from creation through confirm or
//! cancel. The dangerous step, handing money to the wallet, happens
//! exactly once per record: the record is sealed (made inactive) and
//! persisted before the wallet is called, so a replayed confirm finds a
//! spent record instead of a second transfer.

use std::sync::Arc;

use tracing::{info, warn};

use super::record::{PaymentDirection, PaymentRecord, PaymentReceipt};
use crate::core_types::{PartyId, RecordId, Sats};
use crate::error::CoreError;
use crate::lock::LockCoordinator;
use crate::notify::{Event, NotificationSink};
use crate::storage::{RecordStore, save};
use crate::wallet::{TransferOutcome, TransferSpec, WalletService};

/// Single-transfer orchestrator
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn RecordStore>,
    wallet: Arc<dyn WalletService>,
    notifier: Arc<dyn NotificationSink>,
    locks: Arc<LockCoordinator>,
}

impl PaymentService {
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

    /// Create a payer-initiated transfer awaiting the payer's confirm.
    ///
    /// The balance check here is a courtesy: it stops a payer from
    /// offering a payment they visibly cannot cover. The binding check
    /// happens again under the lock at confirm time.
    pub async fn create_pay(
        &self,
        payer: PartyId,
        payee: PartyId,
        amount: Sats,
        memo: Option<String>,
    ) -> Result<PaymentRecord, CoreError> {
        if amount < 1 {
            return Err(CoreError::InvalidAmount);
        }
        if payer == payee {
            return Err(CoreError::SelfTransfer);
        }
        if self.wallet.balance(payer).await? < amount {
            return Err(CoreError::InsufficientFunds);
        }

        let payment = PaymentRecord::new_pay(payer, payee, amount, memo);
        save(self.store.as_ref(), &payment).await?;
        info!(record_id = %payment.id(), payer, payee, amount, "payment offered");
        Ok(payment)
    }

    /// Create a payee-initiated request; whoever confirms becomes the payer.
    pub async fn create_receive(
        &self,
        payee: PartyId,
        amount: Sats,
        memo: Option<String>,
    ) -> Result<PaymentRecord, CoreError> {
        if amount < 1 {
            return Err(CoreError::InvalidAmount);
        }

        let payment = PaymentRecord::new_receive(payee, amount, memo);
        save(self.store.as_ref(), &payment).await?;
        info!(record_id = %payment.id(), payee, amount, "payment requested");
        Ok(payment)
    }

    /// Execute the transfer behind a record, exactly once.
    pub async fn confirm(
        &self,
        id: &RecordId,
        requester: PartyId,
    ) -> Result<PaymentReceipt, CoreError> {
        // Authorization and self-dealing run on fields that never change
        // after creation, so they are sound before the lock.
        let probe: PaymentRecord = self.locks.peek(id).await?;
        let payer = match probe.direction {
            PaymentDirection::Pay => {
                if requester != probe.creator {
                    return Err(CoreError::Forbidden);
                }
                probe.creator
            }
            PaymentDirection::Receive => requester,
        };
        if payer == probe.payee {
            return Err(CoreError::SelfTransfer);
        }

        let (mut payment, guard) = self.locks.acquire::<PaymentRecord>(id).await?;

        if !payment.envelope.active {
            self.locks.release(&mut payment, guard).await?;
            return Err(CoreError::AlreadyTerminal(id.to_string()));
        }

        let funds = match self.wallet.balance(payer).await {
            Ok(funds) => funds,
            Err(e) => {
                self.locks.release(&mut payment, guard).await?;
                return Err(e.into());
            }
        };
        if funds < payment.amount {
            // Stays active: the payer can top up and press confirm again.
            self.locks.release(&mut payment, guard).await?;
            return Err(CoreError::InsufficientFunds);
        }

        // Seal and persist before the wallet sees the request.
        payment.seal();
        if let Err(e) = save(self.store.as_ref(), &payment).await {
            self.locks.release(&mut payment, guard).await?;
            return Err(e.into());
        }

        let spec = TransferSpec {
            from: payer,
            to: payment.payee,
            amount: payment.amount,
            memo: payment.memo.clone(),
        };
        match self.wallet.transfer(spec).await {
            Ok(TransferOutcome::Completed { reference }) => {
                payment.mark_confirmed(payer, reference);
                self.locks.release(&mut payment, guard).await?;
            }
            Ok(TransferOutcome::Rejected { reason }) => {
                payment.mark_failed(reason.clone());
                self.locks.release(&mut payment, guard).await?;
                warn!(record_id = %id, reason = %reason, "payment transfer rejected");
                return Err(CoreError::TransferFailed(reason));
            }
            Err(e) => {
                // The record is already sealed; whatever happened at the
                // wallet, this record will never request funds again.
                payment.mark_failed(e.to_string());
                self.locks.release(&mut payment, guard).await?;
                return Err(e.into());
            }
        }

        info!(
            record_id = %id,
            payer,
            payee = payment.payee,
            amount = payment.amount,
            "payment confirmed"
        );

        let receipt = payment.receipt();
        self.notifier
            .notify(payer, Event::Payment(receipt.clone()))
            .await;
        self.notifier
            .notify(payment.payee, Event::Payment(receipt.clone()))
            .await;
        self.notifier
            .update_display(id, Event::Payment(receipt.clone()))
            .await;

        Ok(receipt)
    }

    /// Withdraw a pending record. Creator only; no wallet interaction.
    ///
    /// Cancelling something already terminal is a quiet no-op so a second
    /// press never surfaces an error.
    pub async fn cancel(
        &self,
        id: &RecordId,
        requester: PartyId,
    ) -> Result<PaymentReceipt, CoreError> {
        let probe: PaymentRecord = self.locks.peek(id).await?;
        if requester != probe.creator {
            return Err(CoreError::Forbidden);
        }

        let (mut payment, guard) = self.locks.acquire::<PaymentRecord>(id).await?;

        if !payment.envelope.active {
            self.locks.release(&mut payment, guard).await?;
            return Ok(payment.receipt());
        }

        payment.mark_cancelled();
        self.locks.release(&mut payment, guard).await?;
        info!(record_id = %id, requester, "payment cancelled");

        let receipt = payment.receipt();
        self.notifier
            .update_display(id, Event::Payment(receipt.clone()))
            .await;
        Ok(receipt)
    }

    /// Current record snapshot, lock-free.
    pub async fn status(&self, id: &RecordId) -> Result<PaymentReceipt, CoreError> {
        let payment: PaymentRecord = self.locks.peek(id).await?;
        Ok(payment.receipt())
    }
}
