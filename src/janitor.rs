//! Stale-Lock Janitor
//!
//! Background sweeper that repairs records whose `in_progress` flag
//! outlived its holder, which happens when a process dies between acquire
//! and release. Live holders are safe as long as the stale threshold
//! comfortably exceeds the lock timeout.
//!
//! The janitor patches raw stored bodies, so it works across every record
//! type without decoding domain fields. It never touches `active` and it
//! never touches domain state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::JanitorConfig;
use crate::core_types::now_ms;
use crate::error::CoreError;
use crate::storage::RecordStore;

/// Periodically clears lock flags left behind by dead handlers.
pub struct Janitor {
    store: Arc<dyn RecordStore>,
    scan_interval: Duration,
    stale_threshold: Duration,
    batch_size: usize,
}

impl Janitor {
    pub fn new(store: Arc<dyn RecordStore>, config: &JanitorConfig) -> Self {
        Self {
            store,
            scan_interval: Duration::from_secs(config.scan_interval_secs),
            stale_threshold: Duration::from_secs(config.stale_threshold_secs),
            batch_size: config.batch_size,
        }
    }

    pub fn with_defaults(store: Arc<dyn RecordStore>) -> Self {
        Self::new(store, &JanitorConfig::default())
    }

    /// Run the sweep loop forever. Spawn this on its own task.
    pub async fn run(&self) {
        info!(
            scan_interval_secs = self.scan_interval.as_secs(),
            stale_threshold_secs = self.stale_threshold.as_secs(),
            "starting stale-lock janitor"
        );

        loop {
            if let Err(e) = self.sweep().await {
                error!(error = %e, "lock sweep failed");
            }
            tokio::time::sleep(self.scan_interval).await;
        }
    }

    /// One scan over the store. Returns how many locks were repaired.
    pub async fn sweep(&self) -> Result<usize, CoreError> {
        let ids = self.store.ids().await?;
        let cutoff = now_ms() - self.stale_threshold.as_millis() as i64;
        let mut repaired = 0usize;

        for id in ids {
            if repaired >= self.batch_size {
                debug!(batch_size = self.batch_size, "sweep batch limit reached");
                break;
            }

            let Some(mut stored) = self.store.get(&id).await? else {
                continue;
            };
            let held = stored
                .body
                .get("in_progress")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !held {
                continue;
            }

            let stale = match stored.body.get("locked_at_ms").and_then(Value::as_i64) {
                Some(locked_at) => locked_at <= cutoff,
                // Flag up with no stamp: a torn write from an old holder.
                None => true,
            };
            if !stale {
                continue;
            }

            stored.body["in_progress"] = Value::Bool(false);
            stored.body["locked_at_ms"] = Value::Null;
            self.store.set(stored).await?;
            warn!(record_id = %id, "cleared stale record lock");
            repaired += 1;
        }

        if repaired > 0 {
            info!(count = repaired, "repaired stale locks this sweep");
        }
        Ok(repaired)
    }
}
