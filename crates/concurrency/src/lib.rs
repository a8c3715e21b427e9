//! Concurrency coordination primitives (C9, part of C10's lock pair)
//!
//! Three independent pieces of machinery:
//! - [`WorkSync`] serializes mutation of an auxiliary store (id
//!   generators, listeners) across concurrent commits.
//! - [`locks`] hands out the per-record exclusive locks a transaction
//!   must hold over everything it mutates.
//! - [`upgrade_lock`] is the shared/exclusive lock pair the kernel
//!   version upgrade protocol serializes against ordinary commits with.

#![warn(missing_docs)]

pub mod locks;
pub mod upgrade_lock;
pub mod worksync;

pub use locks::{LockService, NoopLockService, RecordLockService};
pub use upgrade_lock::{ExclusiveUpgradeGuard, SharedUpgradeGuard, UpgradeLock};
pub use worksync::WorkSync;
