//! Shared/exclusive upgrade lock pair (§4.7, §5, C10)
//!
//! Every write-commit holds the *shared* side of this lock for the
//! duration of its commit; the upgrade command injector takes the
//! *exclusive* side just long enough to prepend a version-transition
//! command. The exclusive side is a best-effort, bounded-wait
//! acquisition: when a committing transaction is holding the shared
//! side, the upgrader gives up rather than blocking the database, and
//! retries on the next write (spec §4.7 "Deadlock handling").

use parking_lot::RwLock;
use std::time::Duration;

/// An acquired shared upgrade lock, released on drop. Held by a
/// transaction for the duration of its commit.
pub struct SharedUpgradeGuard<'a> {
    _guard: parking_lot::RwLockReadGuard<'a, ()>,
}

/// The upgrade lock pair described in spec §5: readers are ordinary
/// committing transactions, the writer is the upgrade command
/// injector.
pub struct UpgradeLock {
    lock: RwLock<()>,
}

impl UpgradeLock {
    /// An unheld upgrade lock.
    pub fn new() -> Self {
        Self { lock: RwLock::new(()) }
    }

    /// Acquire the shared side for a committing transaction. Never
    /// blocks on another shared holder; only the rare exclusive upgrade
    /// acquisition can delay this.
    pub fn acquire_shared(&self) -> SharedUpgradeGuard<'_> {
        SharedUpgradeGuard {
            _guard: self.lock.read(),
        }
    }

    /// Attempt to acquire the exclusive side within `timeout`. Returns
    /// `None` if a committing transaction is still holding the shared
    /// side when the wait elapses; the caller (the upgrade coordinator)
    /// treats that as "not possible right now" and retries on the next
    /// write rather than blocking.
    pub fn try_acquire_exclusive(&self, timeout: Duration) -> Option<ExclusiveUpgradeGuard<'_>> {
        self.lock
            .try_write_for(timeout)
            .map(|guard| ExclusiveUpgradeGuard { _guard: guard })
    }
}

impl Default for UpgradeLock {
    fn default() -> Self {
        Self::new()
    }
}

/// An acquired exclusive upgrade lock, released on drop.
pub struct ExclusiveUpgradeGuard<'a> {
    _guard: parking_lot::RwLockWriteGuard<'a, ()>,
}
