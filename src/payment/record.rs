//! Payment Record and Views
//!
//! One two-party transfer gated by an explicit confirm step. The tagged
//! [`PaymentState`] is the authority on what happened to the record; the
//! envelope's `active` flag tracks it so the generic lock layer can keep
//! working on flags alone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_types::{PartyId, RecordId, RecordKind, Sats, now_ms};
use crate::storage::{Lockable, TxEnvelope};

/// Which party a payment record authorizes to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    /// Created by the payer; only the payer may confirm
    Pay,
    /// Created by the payee; whoever confirms becomes the payer
    Receive,
}

impl PaymentDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentDirection::Pay => "PAY",
            PaymentDirection::Receive => "RECEIVE",
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            PaymentDirection::Pay => RecordKind::Pay,
            PaymentDirection::Receive => RecordKind::Receive,
        }
    }
}

impl fmt::Display for PaymentDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment lifecycle.
///
/// ```text
/// PENDING ──▶ CONFIRMED
///    │  └───▶ CANCELLED
///    └──────▶ FAILED
/// ```
///
/// Everything except `Pending` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    /// Funds moved; `reference` is the wallet's identifier for the transfer
    Confirmed { reference: String },
    /// Withdrawn by its creator before any funds moved
    Cancelled,
    /// The wallet attempt failed; the record is spent and stays spent
    Failed { reason: String },
}

impl PaymentState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "PENDING",
            PaymentState::Confirmed { .. } => "CONFIRMED",
            PaymentState::Cancelled => "CANCELLED",
            PaymentState::Failed { .. } => "FAILED",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single confirm-gated transfer between two parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(flatten)]
    pub envelope: TxEnvelope,
    pub direction: PaymentDirection,
    /// For `Pay` fixed at creation; for `Receive` unknown until confirm
    pub payer: Option<PartyId>,
    pub payee: PartyId,
    pub amount: Sats,
    pub memo: Option<String>,
    /// Party that created the record; the only one allowed to cancel it
    pub creator: PartyId,
    pub state: PaymentState,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl PaymentRecord {
    pub fn new_pay(payer: PartyId, payee: PartyId, amount: Sats, memo: Option<String>) -> Self {
        let now = now_ms();
        Self {
            envelope: TxEnvelope::new(RecordId::generate(RecordKind::Pay, payer, amount)),
            direction: PaymentDirection::Pay,
            payer: Some(payer),
            payee,
            amount,
            memo,
            creator: payer,
            state: PaymentState::Pending,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    pub fn new_receive(payee: PartyId, amount: Sats, memo: Option<String>) -> Self {
        let now = now_ms();
        Self {
            envelope: TxEnvelope::new(RecordId::generate(RecordKind::Receive, payee, amount)),
            direction: PaymentDirection::Receive,
            payer: None,
            payee,
            amount,
            memo,
            creator: payee,
            state: PaymentState::Pending,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.envelope.id
    }

    /// Point of no return before the wallet call goes out.
    ///
    /// A crash between this write and the wallet's answer leaves a dead
    /// but unspent record: funds safety over availability.
    pub fn seal(&mut self) {
        self.envelope.active = false;
        self.updated_at_ms = now_ms();
    }

    pub fn mark_confirmed(&mut self, payer: PartyId, reference: String) {
        self.payer = Some(payer);
        self.state = PaymentState::Confirmed { reference };
        self.envelope.active = false;
        self.updated_at_ms = now_ms();
    }

    pub fn mark_cancelled(&mut self) {
        self.state = PaymentState::Cancelled;
        self.envelope.active = false;
        self.updated_at_ms = now_ms();
    }

    pub fn mark_failed(&mut self, reason: String) {
        self.state = PaymentState::Failed { reason };
        self.envelope.active = false;
        self.updated_at_ms = now_ms();
    }

    /// Snapshot for callers and display surfaces.
    pub fn receipt(&self) -> PaymentReceipt {
        PaymentReceipt {
            record_id: self.envelope.id.clone(),
            direction: self.direction,
            payer: self.payer,
            payee: self.payee,
            amount: self.amount,
            state: self.state.clone(),
            memo: self.memo.clone(),
        }
    }
}

impl Lockable for PaymentRecord {
    fn envelope(&self) -> &TxEnvelope {
        &self.envelope
    }
    fn envelope_mut(&mut self) -> &mut TxEnvelope {
        &mut self.envelope
    }
}

/// Immutable snapshot of a payment record
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub record_id: RecordId,
    pub direction: PaymentDirection,
    pub payer: Option<PartyId>,
    pub payee: PartyId,
    pub amount: Sats,
    pub state: PaymentState,
    pub memo: Option<String>,
}

impl PaymentReceipt {
    /// Wallet reference of a confirmed payment, if there is one.
    pub fn reference(&self) -> Option<&str> {
        match &self.state {
            PaymentState::Confirmed { reference } => Some(reference),
            _ => None,
        }
    }
}
