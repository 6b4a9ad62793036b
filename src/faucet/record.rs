//! Faucet Record and Views
//!
//! The persisted shape of a distribution pool, plus the immutable
//! snapshots handed to callers and the notification sink.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_types::{PartyId, RecordId, RecordKind, Sats, now_ms};
use crate::storage::{Lockable, TxEnvelope};

/// Why a pool stopped accepting claims.
///
/// Written exactly once: the first closer wins and later closers are
/// no-ops, so a cancel landing after the last share reads `Exhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The pool could no longer cover a full share
    Exhausted,
    /// The owner shut the pool down early
    Cancelled,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Exhausted => "EXHAUSTED",
            CloseReason::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bounded pool of value that distinct claimants drain one share at a
/// time, each at most once.
///
/// # Invariants
///
/// 1. `capacity` and `share` are fixed at creation, `share` divides `capacity`
/// 2. `remaining` only ever decreases, in steps of exactly `share`
/// 3. `claimants` holds no party twice and `served == claimants.len()`
/// 4. `closed` is `Some` exactly when the envelope is inactive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetRecord {
    #[serde(flatten)]
    pub envelope: TxEnvelope,
    /// Owner funding the pool
    pub source: PartyId,
    pub capacity: Sats,
    pub share: Sats,
    pub remaining: Sats,
    /// Insertion-ordered; order is part of the displayed state
    pub claimants: Vec<PartyId>,
    pub served: u32,
    pub memo: Option<String>,
    pub closed: Option<CloseReason>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl FaucetRecord {
    pub fn new(source: PartyId, capacity: Sats, share: Sats, memo: Option<String>) -> Self {
        let now = now_ms();
        Self {
            envelope: TxEnvelope::new(RecordId::generate(RecordKind::Faucet, source, capacity)),
            source,
            capacity,
            share,
            remaining: capacity,
            claimants: Vec::new(),
            served: 0,
            memo,
            closed: None,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.envelope.id
    }

    pub fn has_claimed(&self, party: PartyId) -> bool {
        self.claimants.contains(&party)
    }

    /// True when the pool can no longer cover one full share.
    pub fn is_exhausted(&self) -> bool {
        self.remaining < self.share
    }

    pub fn total_shares(&self) -> u32 {
        (self.capacity / self.share) as u32
    }

    /// Count one served claimant.
    pub fn record_claim(&mut self, claimant: PartyId) {
        self.claimants.push(claimant);
        self.served += 1;
        self.remaining -= self.share;
        self.updated_at_ms = now_ms();
    }

    /// Close the pool. The first reason to land sticks.
    pub fn close(&mut self, reason: CloseReason) {
        if self.closed.is_none() {
            self.closed = Some(reason);
        }
        self.envelope.active = false;
        self.updated_at_ms = now_ms();
    }

    /// Snapshot for display surfaces.
    pub fn status(&self) -> FaucetStatus {
        FaucetStatus {
            record_id: self.envelope.id.clone(),
            source: self.source,
            capacity: self.capacity,
            share: self.share,
            remaining: self.remaining,
            served: self.served,
            total_shares: self.total_shares(),
            claimants: self.claimants.clone(),
            closed: self.closed,
            memo: self.memo.clone(),
        }
    }

    /// Snapshot for one served claim.
    pub fn claim_receipt(&self, claimant: PartyId) -> ClaimReceipt {
        ClaimReceipt {
            record_id: self.envelope.id.clone(),
            claimant,
            source: self.source,
            amount: self.share,
            remaining: self.remaining,
            served: self.served,
            total_shares: self.total_shares(),
            memo: self.memo.clone(),
        }
    }
}

impl Lockable for FaucetRecord {
    fn envelope(&self) -> &TxEnvelope {
        &self.envelope
    }
    fn envelope_mut(&mut self) -> &mut TxEnvelope {
        &mut self.envelope
    }
}

/// Immutable snapshot of one served claim
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReceipt {
    pub record_id: RecordId,
    pub claimant: PartyId,
    pub source: PartyId,
    /// The share this claimant was granted
    pub amount: Sats,
    /// Pool state after the claim
    pub remaining: Sats,
    pub served: u32,
    pub total_shares: u32,
    pub memo: Option<String>,
}

/// Immutable snapshot of the whole pool
#[derive(Debug, Clone, Serialize)]
pub struct FaucetStatus {
    pub record_id: RecordId,
    pub source: PartyId,
    pub capacity: Sats,
    pub share: Sats,
    pub remaining: Sats,
    pub served: u32,
    pub total_shares: u32,
    pub claimants: Vec<PartyId>,
    pub closed: Option<CloseReason>,
    pub memo: Option<String>,
}

impl FaucetStatus {
    pub fn is_open(&self) -> bool {
        self.closed.is_none()
    }
}

/// What a claim call achieved
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// A share was transferred to the claimant
    Served(ClaimReceipt),
    /// The claimant had already been served; nothing happened
    AlreadyServed,
}

impl ClaimOutcome {
    pub fn is_served(&self) -> bool {
        matches!(self, ClaimOutcome::Served(_))
    }
}
