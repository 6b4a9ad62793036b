//! Record Lock Coordinator
//!
//! Serializes every value-moving operation on a coordinated record so that
//! duplicate triggers (repeated button presses, retried callbacks, racing
//! claimants) execute their critical sections one at a time.
//!
//! # Architecture
//!
//! Two layers of exclusion share one observable contract:
//!
//! 1. **In-process latch**: one async mutex per record ID, held for the
//!    whole critical section. Waiters in the same process park on the
//!    latch instead of hammering the store.
//! 2. **Persisted flag**: `in_progress` on the record itself, set under
//!    the latch and cleared on release. Peers in other processes cannot
//!    see our latch, so they poll this flag at a fixed interval.
//!
//! Either way a waiter gives up after the configured timeout with
//! [`CoreError::LockTimeout`] and zero side effects.
//!
//! # Safety Invariants
//!
//! 1. `acquire` persists `in_progress = true` before returning the record
//! 2. `release` is called on every exit path of a critical section and
//!    persists the record exactly once, mutations included
//! 3. `deactivate` never waits: terminal is a one-way door that must stay
//!    reachable even while the record is locked elsewhere

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::LockConfig;
use crate::core_types::{RecordId, now_ms};
use crate::error::CoreError;
use crate::storage::{Lockable, RecordStore, load, save};

/// Witness that the in-process latch for one record is held.
///
/// Dropping the guard frees the latch; the persisted flag is only cleared
/// by [`LockCoordinator::release`].
#[derive(Debug)]
pub struct TxGuard {
    _held: OwnedMutexGuard<()>,
}

/// Mutual exclusion for coordinated records.
pub struct LockCoordinator {
    store: Arc<dyn RecordStore>,
    /// One latch per record ID. Entries are never removed: a removed
    /// latch could coexist with a clone still held by a waiter, and two
    /// live latches for one ID would break mutual exclusion.
    latches: DashMap<String, Arc<Mutex<()>>>,
    poll_interval: Duration,
    timeout: Duration,
}

impl LockCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, config: &LockConfig) -> Self {
        Self {
            store,
            latches: DashMap::new(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub fn with_defaults(store: Arc<dyn RecordStore>) -> Self {
        Self::new(store, &LockConfig::default())
    }

    /// Read a record without touching any lock state.
    ///
    /// The advisory snapshot services use for authorization checks on
    /// fields that never change after creation.
    pub async fn peek<R: Lockable>(&self, id: &RecordId) -> Result<R, CoreError> {
        match load::<R>(self.store.as_ref(), id).await? {
            Some(record) => Ok(record),
            None => Err(CoreError::NotFound(id.to_string())),
        }
    }

    /// Acquire the lock on a record and return its current state.
    ///
    /// Fails with [`CoreError::NotFound`] before any lock traffic if the
    /// record does not exist, and with [`CoreError::LockTimeout`] if the
    /// lock cannot be had within the configured budget. Neither failure
    /// leaves a trace on the record.
    pub async fn acquire<R: Lockable>(&self, id: &RecordId) -> Result<(R, TxGuard), CoreError> {
        let deadline = Instant::now() + self.timeout;

        // Missing records fail fast, before anyone starts waiting.
        let _: R = self.peek(id).await?;

        let latch = self.latch(id);
        let held = match tokio::time::timeout_at(deadline, latch.lock_owned()).await {
            Ok(held) => held,
            Err(_) => {
                debug!(record_id = %id, "latch wait exceeded deadline");
                return Err(CoreError::LockTimeout(id.to_string()));
            }
        };

        // Out-of-process holders advertise through the persisted flag;
        // wait for them the same way they wait for us.
        loop {
            let mut record: R = self.peek(id).await?;
            if !record.envelope().in_progress {
                let env = record.envelope_mut();
                env.in_progress = true;
                env.locked_at_ms = Some(now_ms());
                save(self.store.as_ref(), &record).await?;
                trace!(record_id = %id, "record lock acquired");
                return Ok((record, TxGuard { _held: held }));
            }

            if Instant::now() + self.poll_interval >= deadline {
                warn!(
                    record_id = %id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "gave up waiting for record lock"
                );
                return Err(CoreError::LockTimeout(id.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Release the lock, persisting the record as mutated by the caller.
    ///
    /// Flag clear and domain mutation land in a single write. The latch is
    /// freed even if the write fails; the persisted flag then stays set
    /// until the janitor repairs it, which out-of-process waiters already
    /// tolerate.
    pub async fn release<R: Lockable>(
        &self,
        record: &mut R,
        guard: TxGuard,
    ) -> Result<(), CoreError> {
        let env = record.envelope_mut();
        env.in_progress = false;
        env.locked_at_ms = None;

        let saved = save(self.store.as_ref(), record).await;
        drop(guard);

        if let Err(e) = &saved {
            warn!(
                record_id = %record.envelope().id,
                error = %e,
                "failed to persist lock release"
            );
        } else {
            trace!(record_id = %record.envelope().id, "record lock released");
        }
        saved.map_err(Into::into)
    }

    /// Permanently deactivate a record, lock or no lock.
    ///
    /// Idempotent: an already-terminal record is returned unchanged and
    /// the mutator is not run, so the first deactivation wins. Only the
    /// caller's mutation and the `active` flag are persisted; a lock flag
    /// some other handler holds right now is left exactly as it is.
    pub async fn deactivate<R, F>(&self, id: &RecordId, mutate: F) -> Result<R, CoreError>
    where
        R: Lockable,
        F: FnOnce(&mut R),
    {
        let mut record: R = self.peek(id).await?;
        if !record.envelope().active {
            return Ok(record);
        }

        mutate(&mut record);
        record.envelope_mut().active = false;
        save(self.store.as_ref(), &record).await?;
        info!(record_id = %id, "record deactivated");
        Ok(record)
    }

    fn latch(&self, id: &RecordId) -> Arc<Mutex<()>> {
        self.latches
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
