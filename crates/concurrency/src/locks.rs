//! Record-level exclusive locking and lock-verification support (§5, C5)
//!
//! Every node and relationship a transaction mutates is covered by an
//! exclusive record lock for the transaction's duration (spec §5).
//! `RecordLockService` is the production implementation; `NoopLockService`
//! stands in for `RECOVERY`/`REVERSE_RECOVERY`, where locks were already
//! acquired (and released) pre-crash and re-acquiring them would be both
//! unnecessary and, for a single-threaded replay, impossible to contend.

use graphkernel_core::error::{Error, Result};
use graphkernel_core::ids::RecordId;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Acquires and releases the exclusive record locks a transaction holds
/// for its duration.
pub trait LockService: Send + Sync {
    /// Acquire an exclusive lock on `record` for `tx`, blocking up to
    /// `timeout`. Reentrant: a transaction that already holds the lock
    /// succeeds immediately.
    fn acquire_exclusive(&self, record: RecordId, tx: u64, timeout: Duration) -> Result<()>;

    /// Release every lock held by `tx`. Idempotent.
    fn release_all(&self, tx: u64);

    /// True if `tx` currently holds an exclusive lock on `record`. Used
    /// by the integrity validator's lock-verification mode (spec §4.6d).
    fn holds(&self, record: RecordId, tx: u64) -> bool;
}

struct State {
    owners: HashMap<RecordId, u64>,
    held_by_tx: HashMap<u64, HashSet<RecordId>>,
    waits_for: HashMap<u64, RecordId>,
}

/// The production [`LockService`]: one exclusive owner per record,
/// bounded-wait blocking, and a direct (two-party) deadlock check.
pub struct RecordLockService {
    state: Mutex<State>,
    released: Condvar,
}

impl RecordLockService {
    /// An empty lock table.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                owners: HashMap::new(),
                held_by_tx: HashMap::new(),
                waits_for: HashMap::new(),
            }),
            released: Condvar::new(),
        }
    }

    /// True if `tx` is waiting (transitively, through at most one hop)
    /// on a record held by a transaction that is itself waiting on a
    /// record `tx` holds. A full wait-for-graph cycle search would
    /// catch longer cycles too; this direct check covers the common
    /// two-transaction deadlock and is cheap to run on every blocked
    /// acquire.
    fn would_deadlock(&self, state: &State, tx: u64, target: RecordId) -> bool {
        let Some(&holder) = state.owners.get(&target) else {
            return false;
        };
        if holder == tx {
            return false;
        }
        match state.waits_for.get(&holder) {
            Some(holder_waits_on) => state
                .held_by_tx
                .get(&tx)
                .map(|held| held.contains(holder_waits_on))
                .unwrap_or(false),
            None => false,
        }
    }
}

impl Default for RecordLockService {
    fn default() -> Self {
        Self::new()
    }
}

impl LockService for RecordLockService {
    fn acquire_exclusive(&self, record: RecordId, tx: u64, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match state.owners.get(&record) {
                None => {
                    state.owners.insert(record, tx);
                    state.held_by_tx.entry(tx).or_default().insert(record);
                    state.waits_for.remove(&tx);
                    return Ok(());
                }
                Some(&holder) if holder == tx => return Ok(()),
                Some(_) => {
                    if self.would_deadlock(&state, tx, record) {
                        state.waits_for.remove(&tx);
                        return Err(Error::Deadlock);
                    }
                    state.waits_for.insert(tx, record);
                    let now = Instant::now();
                    if now >= deadline {
                        state.waits_for.remove(&tx);
                        return Err(Error::LockTimeout(timeout));
                    }
                    let timed_out = self
                        .released
                        .wait_for(&mut state, deadline - now)
                        .timed_out();
                    if timed_out {
                        state.waits_for.remove(&tx);
                        return Err(Error::LockTimeout(timeout));
                    }
                }
            }
        }
    }

    fn release_all(&self, tx: u64) {
        let mut state = self.state.lock();
        if let Some(records) = state.held_by_tx.remove(&tx) {
            for record in records {
                state.owners.remove(&record);
            }
        }
        state.waits_for.remove(&tx);
        drop(state);
        self.released.notify_all();
    }

    fn holds(&self, record: RecordId, tx: u64) -> bool {
        self.state.lock().owners.get(&record) == Some(&tx)
    }
}

/// A [`LockService`] that grants every request immediately and reports
/// every record as locked. Used for `RECOVERY`/`REVERSE_RECOVERY`
/// replay, which is single-threaded and re-derives already-committed
/// state (spec §4.4: "RECOVERY and REVERSE_RECOVERY use a no-op lock
/// service").
pub struct NoopLockService;

impl LockService for NoopLockService {
    fn acquire_exclusive(&self, _record: RecordId, _tx: u64, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn release_all(&self, _tx: u64) {}

    fn holds(&self, _record: RecordId, _tx: u64) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_core::ids::RecordKind;
    use std::sync::Arc;
    use std::thread;

    fn rid(id: u64) -> RecordId {
        RecordId::new(RecordKind::Node, id)
    }

    #[test]
    fn second_transaction_blocks_until_release() {
        let service = Arc::new(RecordLockService::new());
        service.acquire_exclusive(rid(1), 1, Duration::from_secs(1)).unwrap();

        let service2 = service.clone();
        let handle = thread::spawn(move || {
            service2.acquire_exclusive(rid(1), 2, Duration::from_secs(1)).unwrap();
        });
        thread::sleep(Duration::from_millis(50));
        service.release_all(1);
        handle.join().unwrap();
        assert!(service.holds(rid(1), 2));
    }

    #[test]
    fn reentrant_acquire_by_same_tx_succeeds() {
        let service = RecordLockService::new();
        service.acquire_exclusive(rid(1), 1, Duration::from_secs(1)).unwrap();
        service.acquire_exclusive(rid(1), 1, Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn contended_acquire_times_out() {
        let service = RecordLockService::new();
        service.acquire_exclusive(rid(1), 1, Duration::from_secs(10)).unwrap();
        let result = service.acquire_exclusive(rid(1), 2, Duration::from_millis(20));
        assert!(matches!(result, Err(Error::LockTimeout(_))));
    }

    #[test]
    fn noop_service_never_blocks_and_reports_held() {
        let service = NoopLockService;
        service.acquire_exclusive(rid(1), 1, Duration::from_secs(0)).unwrap();
        assert!(service.holds(rid(1), 99));
    }
}
