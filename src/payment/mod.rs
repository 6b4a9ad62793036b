//! Single-Transfer Confirmation
//!
//! A payment record is one two-party transfer parked behind an explicit
//! confirm step. `Pay` records are offered by the payer and executable
//! only by them; `Receive` records are requests whose payer is whoever
//! confirms.
//!
//! # State Machine
//!
//! ```text
//! PENDING ──(confirm, wallet ok)───▶ CONFIRMED
//!    │  └───(confirm, wallet no)───▶ FAILED
//!    └──────(creator cancel)───────▶ CANCELLED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Seal-Before-Transfer**: the record is persisted inactive before
//!    the wallet call, so a crash or replay cannot double-spend it
//! 2. **One Wallet Call**: per record, ever; `FAILED` is as final as
//!    `CONFIRMED`
//! 3. **Funds-Check Exception**: an insufficient payer balance leaves the
//!    record active and confirmable; it is the one confirm failure that
//!    does not spend the record

pub mod record;
pub mod service;

#[cfg(test)]
mod integration_tests;

pub use record::{PaymentDirection, PaymentReceipt, PaymentRecord, PaymentState};
pub use service::PaymentService;
