//! Unified error type for the storage engine
//!
//! Every fallible operation in the engine returns [`Result<T>`], an alias
//! for `std::result::Result<T, Error>`. The variants mirror the error
//! kinds in the design: a handful are recoverable per-transaction, the
//! rest mark the database unhealthy and are refused on every subsequent
//! operation until restart. See [`Error::is_recoverable`].

use crate::ids::RecordId;
use std::io;
use thiserror::Error;

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-wide error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    /// Integrity check failed (e.g. deleting a node that still has
    /// relationships). Recoverable: the transaction aborts cleanly.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A schema constraint was violated. Recoverable: the transaction
    /// aborts cleanly.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Lock acquisition did not complete before the transaction's
    /// deadline. Recoverable: the timed-out participant aborts, others
    /// proceed.
    #[error("lock acquisition timed out after {0:?}")]
    LockTimeout(std::time::Duration),

    /// A cycle was detected in the lock wait graph. Recoverable: one
    /// participant (this transaction) is aborted.
    #[error("deadlock detected, transaction aborted")]
    Deadlock,

    /// The upgrade protocol could not acquire its exclusive lock before
    /// its bounded wait elapsed. Non-fatal: logged and retried on the
    /// next write.
    #[error("upgrade conflict: {0}")]
    UpgradeConflict(String),

    /// Underlying I/O failure. The database is marked unhealthy; every
    /// further write is rejected until restart.
    #[error("storage I/O error: {0}")]
    StorageIo(#[from] io::Error),

    /// A record with an unrecognised format version was encountered.
    /// Fatal for the operation that hit it.
    #[error("format mismatch for record {record:?}: on-disk version {found}, expected {expected}")]
    FormatMismatch {
        /// The record whose format could not be interpreted.
        record: RecordId,
        /// The format version tag actually found.
        found: u8,
        /// The format version tag the reader expected.
        expected: u8,
    },

    /// An applier in the chain failed while applying a committed batch.
    /// The database is marked unhealthy.
    #[error("apply failed: {0}")]
    ApplyFailure(String),

    /// A fatal misconfiguration, e.g. registering the same listener
    /// kind twice.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// The id space for a record kind is exhausted.
    #[error("no ids remain for {0:?}")]
    OutOfIds(crate::ids::RecordKind),

    /// Encoding or decoding a record/command failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// True for the error kinds that abort only the offending
    /// transaction; the database remains healthy and other transactions
    /// may proceed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Constraint(_)
                | Error::LockTimeout(_)
                | Error::Deadlock
                | Error::UpgradeConflict(_)
        )
    }

    /// True for the error kinds that mark the database unhealthy: every
    /// subsequent operation should be refused until restart.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_recoverable() {
        let err = Error::Validation("cannot delete node with relationships".into());
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn storage_io_is_fatal() {
        let err = Error::StorageIo(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn upgrade_conflict_is_recoverable_not_fatal() {
        let err = Error::UpgradeConflict("exclusive lock busy".into());
        assert!(err.is_recoverable());
    }

    #[test]
    fn apply_failure_is_fatal() {
        let err = Error::ApplyFailure("NeoStoreApplier threw".into());
        assert!(err.is_fatal());
    }
}
