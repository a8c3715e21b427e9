//! Kernel (on-disk format) version
//!
//! A small monotonic enumeration stored in the meta-data record (spec
//! §3). `storeVersion` must never exceed `runtimeVersion`; upgrading is
//! a one-way transition driven by [`crate::command::MetaDataCmd`].

use serde::{Deserialize, Serialize};

/// On-disk format generation. New variants are appended at the end so
/// that the discriminant order matches release order; never reorder or
/// remove a variant once it has shipped, or old stores would silently
/// reinterpret their stamped version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KernelVersion {
    /// Initial format.
    V0 = 0,
    /// First format revision exercised by the upgrade protocol tests.
    V1 = 1,
    /// Second format revision.
    V2 = 2,
}

impl KernelVersion {
    /// The oldest format this build knows how to read.
    pub const OLDEST_SUPPORTED: KernelVersion = KernelVersion::V0;

    /// The newest format this build can write.
    pub const LATEST: KernelVersion = KernelVersion::V2;

    /// Decode a raw byte, rejecting anything outside the recognised set
    /// (spec §4.6c: upgrade commands require both versions to be in a
    /// recognised version set).
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(KernelVersion::V0),
            1 => Some(KernelVersion::V1),
            2 => Some(KernelVersion::V2),
            _ => None,
        }
    }

    /// Encode as the single byte stored in the meta-data record.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// The next version after this one, if any is known.
    pub fn successor(self) -> Option<Self> {
        KernelVersion::from_byte(self.to_byte() + 1)
    }
}

impl Default for KernelVersion {
    fn default() -> Self {
        KernelVersion::V0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_release_order() {
        assert!(KernelVersion::V0 < KernelVersion::V1);
        assert!(KernelVersion::V1 < KernelVersion::V2);
    }

    #[test]
    fn round_trips_through_byte() {
        for v in [KernelVersion::V0, KernelVersion::V1, KernelVersion::V2] {
            assert_eq!(KernelVersion::from_byte(v.to_byte()), Some(v));
        }
    }

    #[test]
    fn rejects_unrecognised_byte() {
        assert_eq!(KernelVersion::from_byte(200), None);
    }

    #[test]
    fn successor_of_latest_is_none() {
        assert_eq!(KernelVersion::LATEST.successor(), None);
    }
}
