//! Kernel-version upgrade coordinator (C10, spec §4.7)
//!
//! A single-shot state machine: given the store's on-disk version and
//! this build's runtime version, decide whether a synthetic
//! [`MetaDataCmd`] should be prepended to the next commit. Tries the
//! exclusive side of the [`UpgradeLock`] with a bounded wait so a
//! committing transaction is never blocked on the upgrade; if the lock
//! can't be taken in time, logs and defers to the next write rather
//! than retrying in a loop.

use graphkernel_concurrency::upgrade_lock::UpgradeLock;
use graphkernel_core::command::MetaDataCmd;
use graphkernel_core::kernel_version::KernelVersion;
use std::time::Duration;
use tracing::warn;

/// How long the coordinator waits for the exclusive upgrade lock
/// before giving up for this write.
pub const UPGRADE_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// Drives the one-way kernel-version transition.
pub struct UpgradeCoordinator;

impl UpgradeCoordinator {
    /// If `store_version` lags `runtime_version`, attempt the
    /// transition: take the exclusive upgrade lock, re-read the store
    /// version (a concurrent upgrader may have already moved it), and
    /// if it is still behind, return the command to prepend. Returns
    /// `None` when already current or when the lock could not be taken
    /// in time.
    pub fn maybe_upgrade(
        store_version: KernelVersion,
        runtime_version: KernelVersion,
        reread_store_version: impl FnOnce() -> KernelVersion,
        lock: &UpgradeLock,
    ) -> Option<MetaDataCmd> {
        if store_version >= runtime_version {
            return None;
        }

        match lock.try_acquire_exclusive(UPGRADE_LOCK_TIMEOUT) {
            Some(_guard) => {
                let current = reread_store_version();
                if current < runtime_version {
                    Some(MetaDataCmd {
                        before: current,
                        after: runtime_version,
                    })
                } else {
                    None
                }
            }
            None => {
                warn!(
                    "Upgrade from {:?} to {:?} not possible right now due to conflicting transaction, will retry on next write",
                    store_version, runtime_version
                );
                None
            }
        }
    }
}
