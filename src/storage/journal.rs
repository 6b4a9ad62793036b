//! Journal-backed record store.
//!
//! Durability through an append-only JSON-lines journal. Every `set`
//! appends one line and updates an in-memory map; opening the store
//! replays the journal with last-write-wins, so the newest line for each
//! ID is the record.
//!
//! # Design
//!
//! 1. **Append-Only**: sequential writes, no in-place updates
//! 2. **Write-Through**: reads are served from memory, never from disk
//! 3. **Last-Write-Wins Replay**: state is fully rebuilt from the journal
//!
//! The journal only grows; records are never deleted, so there is no
//! compaction step in the write path.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{RecordStore, StorageError, StoredRecord};
use crate::config::StoreConfig;
use crate::core_types::now_ms;

/// One journal line
#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    id: String,
    at_ms: i64,
    body: serde_json::Value,
}

struct JournalFile {
    writer: BufWriter<File>,
    sync_on_write: bool,
}

impl JournalFile {
    fn append(&mut self, entry: &JournalEntry) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(entry).map_err(|e| StorageError::Codec {
            id: entry.id.clone(),
            source: e,
        })?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        if self.sync_on_write {
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }
}

/// Durable record store over an append-only journal.
pub struct JournalStore {
    cache: DashMap<String, serde_json::Value>,
    file: Mutex<JournalFile>,
}

impl JournalStore {
    /// Open the journal at the configured path, replaying existing lines.
    ///
    /// Creates the parent directory if it doesn't exist. Unparseable lines
    /// (a torn tail write after a crash) are skipped with a warning.
    pub fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        if let Some(parent) = Path::new(&config.journal_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let cache = DashMap::new();
        let replayed = Self::replay_into(&config.journal_path, &cache)?;
        if replayed > 0 {
            info!(
                path = %config.journal_path,
                lines = replayed,
                records = cache.len(),
                "journal replayed"
            );
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.journal_path)?;

        Ok(Self {
            cache,
            file: Mutex::new(JournalFile {
                writer: BufWriter::with_capacity(64 * 1024, file),
                sync_on_write: config.sync_on_write,
            }),
        })
    }

    /// Replay journal lines into the map. Returns the line count applied.
    fn replay_into(path: &str, cache: &DashMap<String, serde_json::Value>) -> io::Result<u64> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(0); // No journal yet, fresh start
            }
            Err(e) => return Err(e),
        };

        let reader = BufReader::new(file);
        let mut count = 0u64;
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(&line) {
                Ok(entry) => {
                    cache.insert(entry.id, entry.body);
                    count += 1;
                }
                Err(e) => {
                    warn!(error = %e, "skipping unreadable journal line");
                }
            }
        }
        Ok(count)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Flush buffered lines and sync to disk. For shutdown paths.
    pub async fn sync(&self) -> Result<(), StorageError> {
        let mut file = self.file.lock().await;
        file.writer.flush()?;
        file.writer.get_ref().sync_data()?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JournalStore {
    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        Ok(self.cache.get(id).map(|entry| StoredRecord {
            id: id.to_string(),
            body: entry.value().clone(),
        }))
    }

    async fn set(&self, record: StoredRecord) -> Result<(), StorageError> {
        let entry = JournalEntry {
            id: record.id.clone(),
            at_ms: now_ms(),
            body: record.body.clone(),
        };
        // Journal first, then the read cache. A crash in between replays
        // the line on next open, so the cache can only lag, never lead.
        {
            let mut file = self.file.lock().await;
            file.append(&entry)?;
        }
        self.cache.insert(record.id, record.body);
        Ok(())
    }

    async fn ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.cache.iter().map(|e| e.key().clone()).collect())
    }
}
