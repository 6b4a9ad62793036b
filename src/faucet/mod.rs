//! Multi-Claim Distribution Pool
//!
//! A faucet is a bounded pot of value its owner opens to a chat: every
//! distinct participant may press claim once and drain one fixed share,
//! until the pot can no longer cover a share and closes itself.
//!
//! # State Machine
//!
//! ```text
//! OPEN ──(claims)──▶ OPEN ──(remaining < share)──▶ CLOSED(exhausted)
//!   └───────────────(owner cancel)──────────────▶ CLOSED(cancelled)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **At-Most-Once Per Claimant**: membership is checked under the
//!    record lock before the wallet is called
//! 2. **Exact Accounting**: `remaining` moves only in whole shares, only
//!    after a completed transfer
//! 3. **Terminal Close**: a closed pool never reopens; the first close
//!    decides the recorded reason

pub mod record;
pub mod service;


pub use record::{ClaimOutcome, ClaimReceipt, CloseReason, FaucetRecord, FaucetStatus};
pub use service::FaucetService;
