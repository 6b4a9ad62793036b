//! tipcore - At-most-once coordination for chat-triggered value transfers
//!
//! Chat interactions (button presses, retried callbacks, racing claimants)
//! trigger irreversible balance transfers. This crate makes each logical
//! transfer execute at most once, no matter how many duplicate triggers
//! arrive, by serializing all work on a record behind a per-record lock.
//!
//! # Modules
//!
//! - [`core_types`] - Shared identifiers and units (PartyId, Sats, RecordId)
//! - [`storage`] - Durable record store (envelope, memory and journal backends)
//! - [`lock`] - Record lock coordinator (acquire / release / deactivate)
//! - [`faucet`] - Multi-claim distribution pool state machine
//! - [`payment`] - Single-transfer confirm/cancel state machine
//! - [`wallet`] - Wallet collaborator boundary
//! - [`notify`] - Notification sink boundary
//! - [`janitor`] - Stale-lock sweeper
//! - [`config`] / [`logging`] - YAML config and tracing bootstrap

// Core types - must be first!
pub mod core_types;

// Infrastructure
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

// Coordination layers
pub mod janitor;
pub mod lock;

// Collaborator boundaries
pub mod notify;
pub mod wallet;

// Domain state machines
pub mod faucet;
pub mod payment;

// Convenient re-exports at crate root
pub use config::{AppConfig, JanitorConfig, LockConfig, StoreConfig};
pub use core_types::{PartyId, RecordId, RecordKind, Sats};
pub use error::CoreError;
pub use faucet::{
    ClaimOutcome, ClaimReceipt, CloseReason, FaucetRecord, FaucetService, FaucetStatus,
};
pub use janitor::Janitor;
pub use lock::{LockCoordinator, TxGuard};
pub use notify::{Event, LogSink, NotificationSink, NullSink};
pub use payment::{PaymentDirection, PaymentReceipt, PaymentRecord, PaymentService, PaymentState};
pub use storage::{JournalStore, Lockable, MemoryStore, RecordStore, StoredRecord, TxEnvelope};
pub use wallet::{TransferOutcome, TransferSpec, WalletError, WalletService};
