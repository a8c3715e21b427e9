//! Fixed-size on-disk record formats
//!
//! Every record store is a sequence of fixed-size slots (spec §4.1).
//! Slot `0` holds the in-use flag (`0x00` = not in use, `0x01` = in
//! use) followed by the record's own encoding. [`RecordFormat`] is
//! implemented once per record kind; [`crate::record_store::RecordStore`]
//! is generic over it.

pub mod dynamic;
pub mod meta_data;
pub mod node;
pub mod property;
pub mod relationship;
pub mod relationship_group;
pub mod schema;
pub mod token;

use graphkernel_core::ids::RecordKind;
use thiserror::Error;

/// Failure to interpret the bytes of a record slot.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The slot's format-version byte was not one this build recognises.
    #[error("unrecognised record format version {0}")]
    UnknownFormatVersion(u8),
    /// The slot did not contain enough bytes for its declared format.
    #[error("truncated record: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the format requires.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// A referenced dynamic-chain or token id could not be decoded.
    #[error("malformed record field: {0}")]
    MalformedField(String),
}

/// A fixed-width, in-place-writable encoding for one record kind.
pub trait RecordFormat: Sized {
    /// Which store this format belongs to.
    const KIND: RecordKind;

    /// Width in bytes of one record slot, including the leading in-use
    /// byte that [`crate::record_store::RecordStore`] manages on the
    /// caller's behalf (the payload itself occupies
    /// `RECORD_SIZE - 1` bytes).
    const RECORD_SIZE: usize;

    /// Encode `self` into `buf`, which is exactly `RECORD_SIZE - 1`
    /// bytes (the payload region, not including the in-use byte).
    fn encode(&self, buf: &mut [u8]);

    /// Decode a payload region of `RECORD_SIZE - 1` bytes.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError>;
}
