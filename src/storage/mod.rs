//! Durable Record Store
//!
//! Every coordinated record is persisted as a self-describing JSON body
//! under its ID string. The store contract is deliberately small: get one,
//! put one, list keys. There is no atomicity beyond a single-key write;
//! correctness under concurrency comes from the lock coordinator, not from
//! the store.
//!
//! # Layout
//!
//! - [`TxEnvelope`] - lock and lifecycle flags embedded in every record
//! - [`Lockable`] - trait giving the coordinator typed access to the envelope
//! - [`RecordStore`] - the async store contract
//! - [`MemoryStore`] / [`JournalStore`] - the two shipped implementations

pub mod journal;
pub mod memory;

pub use journal::JournalStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core_types::RecordId;

/// Storage-layer failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),

    #[error("record body codec failed for {id}: {source}")]
    Codec {
        id: String,
        source: serde_json::Error,
    },
}

/// Lock and lifecycle flags carried by every persisted record.
///
/// # Safety Invariants
///
/// 1. `id` never changes after creation
/// 2. `active` is terminal: once false it never becomes true again
/// 3. `in_progress` is true only while a handler holds the record lock
/// 4. `locked_at_ms` is a staleness witness for crash recovery only; it
///    carries no authority of its own
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxEnvelope {
    pub id: RecordId,
    pub active: bool,
    pub in_progress: bool,
    #[serde(default)]
    pub locked_at_ms: Option<i64>,
}

impl TxEnvelope {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            active: true,
            in_progress: false,
            locked_at_ms: None,
        }
    }
}

/// A record the lock coordinator can manage.
///
/// Implementors embed a [`TxEnvelope`] with `#[serde(flatten)]` so the
/// envelope fields live at the top level of the stored JSON body. The
/// stale-lock janitor depends on that layout to repair records without
/// knowing their concrete type.
pub trait Lockable: Serialize + DeserializeOwned + Send + Sync {
    fn envelope(&self) -> &TxEnvelope;
    fn envelope_mut(&mut self) -> &mut TxEnvelope;
}

/// One stored record: ID string plus self-describing JSON body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub body: serde_json::Value,
}

/// The durable store contract.
///
/// Implementations must make a completed `set` visible to every later
/// `get`, including gets from other tasks. Nothing else is required.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by ID. `None` when the key has never been written.
    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, StorageError>;

    /// Write a record, replacing any previous body under the same ID.
    async fn set(&self, record: StoredRecord) -> Result<(), StorageError>;

    /// List every stored record ID, in no particular order.
    async fn ids(&self) -> Result<Vec<String>, StorageError>;
}

/// Decode a typed record out of the store.
pub async fn load<R: Lockable>(
    store: &dyn RecordStore,
    id: &RecordId,
) -> Result<Option<R>, StorageError> {
    let Some(stored) = store.get(id.as_str()).await? else {
        return Ok(None);
    };
    let record = serde_json::from_value(stored.body).map_err(|e| StorageError::Codec {
        id: id.to_string(),
        source: e,
    })?;
    Ok(Some(record))
}

/// Encode a typed record into the store under its envelope ID.
pub async fn save<R: Lockable>(store: &dyn RecordStore, record: &R) -> Result<(), StorageError> {
    let id = record.envelope().id.to_string();
    let body = serde_json::to_value(record).map_err(|e| StorageError::Codec {
        id: id.clone(),
        source: e,
    })?;
    store.set(StoredRecord { id, body }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Probe {
        #[serde(flatten)]
        envelope: TxEnvelope,
        note: String,
    }

    impl Lockable for Probe {
        fn envelope(&self) -> &TxEnvelope {
            &self.envelope
        }
        fn envelope_mut(&mut self) -> &mut TxEnvelope {
            &mut self.envelope
        }
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let store = MemoryStore::new();
        let id = RecordId::new("probe-1-1-aaaaa");
        let probe = Probe {
            envelope: TxEnvelope::new(id.clone()),
            note: "hello".into(),
        };

        save(&store, &probe).await.unwrap();
        let back: Probe = load(&store, &id).await.unwrap().unwrap();
        assert_eq!(back.note, "hello");
        assert!(back.envelope.active);
        assert!(!back.envelope.in_progress);
    }

    #[tokio::test]
    async fn test_envelope_fields_are_top_level() {
        // The janitor patches raw bodies, so the flattened layout is load-bearing.
        let store = MemoryStore::new();
        let id = RecordId::new("probe-2-1-bbbbb");
        let probe = Probe {
            envelope: TxEnvelope::new(id.clone()),
            note: "flat".into(),
        };
        save(&store, &probe).await.unwrap();

        let stored = store.get(id.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.body["id"], "probe-2-1-bbbbb");
        assert_eq!(stored.body["active"], true);
        assert_eq!(stored.body["in_progress"], false);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store = MemoryStore::new();
        let got: Option<Probe> = load(&store, &RecordId::new("probe-0-0-zzzzz"))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_load_wrong_shape_is_codec_error() {
        let store = MemoryStore::new();
        store
            .set(StoredRecord {
                id: "probe-3-1-ccccc".into(),
                body: serde_json::json!({ "unrelated": 42 }),
            })
            .await
            .unwrap();

        let err = load::<Probe>(&store, &RecordId::new("probe-3-1-ccccc"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Codec { .. }));
    }
}
