//! Record read mode
//!
//! Passed to `RecordStore::read` (spec §4.1). Controls how a read
//! behaves when the record it lands on is not marked in-use.

/// How a record read should treat a not-in-use record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordLoadMode {
    /// Fail if the record is not in use. The common case: reading a
    /// record a caller believes exists.
    Normal,
    /// Return whatever bytes are on disk regardless of the in-use flag.
    /// Used by consistency checking and recovery, which need to inspect
    /// records the engine itself considers free.
    Always,
    /// Like `Normal`, but report rather than throw: the caller receives
    /// `Ok(None)` instead of an error. Used by validation paths that
    /// need to distinguish "not in use" from "I/O failure".
    Check,
}
