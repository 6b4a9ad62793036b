//! In-memory record store.
//!
//! Reference implementation over a concurrent map. Used by tests and by
//! ephemeral runs where durability does not matter.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{RecordStore, StorageError, StoredRecord};

/// Thread-safe in-memory store keyed by record ID.
pub struct MemoryStore {
    records: DashMap<String, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        Ok(self.records.get(id).map(|entry| StoredRecord {
            id: id.to_string(),
            body: entry.value().clone(),
        }))
    }

    async fn set(&self, record: StoredRecord) -> Result<(), StorageError> {
        self.records.insert(record.id, record.body);
        Ok(())
    }

    async fn ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.records.iter().map(|e| e.key().clone()).collect())
    }
}
