//! Notification Sink Boundary
//!
//! The chat transport seen from the core: direct messages to parties and
//! updates to the shared surface a record lives on. The core hands over
//! immutable event snapshots; rendering them into chat text is entirely
//! the sink's business.
//!
//! Delivery is fire-and-forget. A committed transfer is never unwound
//! because a message failed to send, so the trait is infallible and
//! implementations swallow and log their own errors.

use async_trait::async_trait;
use tracing::info;

use crate::core_types::{PartyId, RecordId};
use crate::faucet::{ClaimReceipt, FaucetStatus};
use crate::payment::PaymentReceipt;

/// One notifiable thing that happened to a record
#[derive(Debug, Clone)]
pub enum Event {
    /// A faucet share was granted
    ClaimServed(ClaimReceipt),
    /// Faucet pool state changed (claims progressed, closed, cancelled)
    Faucet(FaucetStatus),
    /// A payment reached a new state
    Payment(PaymentReceipt),
}

/// Outbound message channel the core publishes events to
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver an event to one party directly.
    async fn notify(&self, party: PartyId, event: Event);

    /// Refresh the shared display tied to a record.
    async fn update_display(&self, record_id: &RecordId, event: Event);
}

/// Sink that writes events to the log and nothing else.
///
/// The default wiring for headless runs; also documents the expected
/// logging shape for real transport implementations.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, party: PartyId, event: Event) {
        info!(party, event = ?event, "notify");
    }

    async fn update_display(&self, record_id: &RecordId, event: Event) {
        info!(record_id = %record_id, event = ?event, "update display");
    }
}

/// Sink that drops everything.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn notify(&self, _party: PartyId, _event: Event) {}

    async fn update_display(&self, _record_id: &RecordId, _event: Event) {}
}


#[cfg(test)]
pub use recording::RecordingSink;
