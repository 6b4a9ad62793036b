//! Core types used throughout the system
//!
//! These are fundamental identifiers and units shared by all modules.
//! They provide semantic meaning and enable future type evolution.

use std::fmt;

use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

/// Party ID - globally unique identifier for a chat participant.
///
/// # Constraints:
/// - **Immutable**: Once assigned, NEVER changes
/// - **External**: Issued by the chat platform, not by this crate
pub type PartyId = u64;

/// Amount in satoshis. All value in the system is integer sats.
pub type Sats = u64;

/// Milliseconds since the Unix epoch, used for all record timestamps.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The kind of coordinated record an ID belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Multi-claim distribution pool
    Faucet,
    /// Payer-created transfer awaiting the payer's confirmation
    Pay,
    /// Payee-created transfer confirmed by whoever pays it
    Receive,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Faucet => "faucet",
            RecordKind::Pay => "pay",
            RecordKind::Receive => "receive",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage key for a coordinated record.
///
/// Format: `<kind>-<creator>-<amount>-<suffix>` where the suffix is
/// 5 random alphanumerics. The embedded fields are informational; the
/// full string is the only thing ever used for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing ID string (replay, lookup by key).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh ID for a new record.
    pub fn generate(kind: RecordKind, creator: PartyId, amount: Sats) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(5)
            .map(char::from)
            .collect();
        Self(format!("{}-{}-{}-{}", kind.as_str(), creator, amount, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
