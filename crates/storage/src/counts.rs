//! Counts store (C3)
//!
//! A sparse mapping from `(label | ANY_LABEL, relType | ANY_TYPE,
//! otherLabel | ANY_LABEL) -> i64` accumulated delta (spec §3, §4.4
//! `CountsApplier`). Kept as an in-memory `BTreeMap` so iteration order
//! for checkpoint serialization is deterministic, the same choice the
//! teacher makes for its secondary indexes (`storage/src/index.rs`).

use graphkernel_core::command::CountsKey;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

impl PartialOrd for CountsKeyOrd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CountsKeyOrd {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tuple().cmp(&other.tuple())
    }
}

impl PartialEq for CountsKeyOrd {
    fn eq(&self, other: &Self) -> bool {
        self.tuple() == other.tuple()
    }
}
impl Eq for CountsKeyOrd {}

/// `CountsKey` does not implement `Ord` (its `None` components make a
/// natural order awkward to read off the struct definition), so the
/// store keys its map on this thin wrapper instead.
#[derive(Debug, Clone, Copy, Hash)]
struct CountsKeyOrd(CountsKey);

impl CountsKeyOrd {
    fn tuple(&self) -> (u64, u64, u64) {
        (
            self.0.label.map(|t| t.id()).unwrap_or(u64::MAX),
            self.0.rel_type.map(|t| t.id()).unwrap_or(u64::MAX),
            self.0.other_label.map(|t| t.id()).unwrap_or(u64::MAX),
        )
    }
}

/// In-memory counts store.
pub struct CountsStore {
    counters: RwLock<BTreeMap<CountsKeyOrd, i64>>,
}

impl CountsStore {
    /// An empty counts store.
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
        }
    }

    /// Accumulate `delta` into the counter for `key`.
    pub fn apply_delta(&self, key: CountsKey, delta: i64) {
        let mut counters = self.counters.write();
        *counters.entry(CountsKeyOrd(key)).or_insert(0) += delta;
    }

    /// The current value of the counter for `key` (zero if absent).
    pub fn get(&self, key: CountsKey) -> i64 {
        *self
            .counters
            .read()
            .get(&CountsKeyOrd(key))
            .unwrap_or(&0)
    }

    /// Total number of distinct counters tracked, for tests and
    /// diagnostics.
    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    /// True if no counters have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the entire counts map, used by the upgrade-rebuild path
    /// which recomputes counts from the record stores under an
    /// exclusive checkpoint barrier (spec Invariant 5).
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (CountsKey, i64)>) {
        let mut counters = self.counters.write();
        counters.clear();
        for (key, value) in entries {
            counters.insert(CountsKeyOrd(key), value);
        }
    }

    /// Every `(key, value)` pair currently tracked, in deterministic
    /// (sorted) order.
    pub fn snapshot(&self) -> Vec<(CountsKey, i64)> {
        self.counters
            .read()
            .iter()
            .map(|(k, v)| (k.0, *v))
            .collect()
    }

    /// Flush the counters to `path` as a length-prefixed dump (spec
    /// §4.8 checkpoint: "counts → degrees → record stores").
    pub fn flush(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let snapshot = self.snapshot();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(snapshot.len() as u64).to_le_bytes());
        for (key, value) in snapshot {
            bytes.extend_from_slice(&key.label.map(|t| t.id()).unwrap_or(u64::MAX).to_le_bytes());
            bytes.extend_from_slice(
                &key.rel_type
                    .map(|t| t.id())
                    .unwrap_or(u64::MAX)
                    .to_le_bytes(),
            );
            bytes.extend_from_slice(
                &key.other_label
                    .map(|t| t.id())
                    .unwrap_or(u64::MAX)
                    .to_le_bytes(),
            );
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        std::fs::File::create(path)?.write_all(&bytes)
    }

    /// Reload from a dump written by [`Self::flush`].
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        use graphkernel_core::ids::TokenId;
        let store = Self::new();
        let path = path.as_ref();
        if !path.exists() {
            return Ok(store);
        }
        let mut bytes = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
        if bytes.len() < 8 {
            return Ok(store);
        }
        let count = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
        let mut offset = 8;
        let read_opt_id = |bytes: &[u8]| -> Option<TokenId> {
            let raw = u64::from_le_bytes(bytes.try_into().unwrap());
            if raw == u64::MAX {
                None
            } else {
                Some(TokenId::new(raw))
            }
        };
        for _ in 0..count {
            let label = read_opt_id(&bytes[offset..offset + 8]);
            let rel_type = read_opt_id(&bytes[offset + 8..offset + 16]);
            let other_label = read_opt_id(&bytes[offset + 16..offset + 24]);
            let value = i64::from_le_bytes(bytes[offset + 24..offset + 32].try_into().unwrap());
            offset += 32;
            store.apply_delta(
                CountsKey {
                    label,
                    rel_type,
                    other_label,
                },
                value,
            );
        }
        Ok(store)
    }
}

impl Default for CountsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_core::ids::TokenId;

    fn key(label: u64) -> CountsKey {
        CountsKey {
            label: Some(TokenId::new(label)),
            rel_type: None,
            other_label: None,
        }
    }

    #[test]
    fn deltas_accumulate() {
        let store = CountsStore::new();
        store.apply_delta(key(1), 1);
        store.apply_delta(key(1), 1);
        store.apply_delta(key(1), -1);
        assert_eq!(store.get(key(1)), 1);
    }

    #[test]
    fn absent_counter_reads_as_zero() {
        let store = CountsStore::new();
        assert_eq!(store.get(key(99)), 0);
    }

    #[test]
    fn flush_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.dump");
        let store = CountsStore::new();
        store.apply_delta(key(1), 3);
        store.apply_delta(key(2), -2);
        store.flush(&path).unwrap();

        let reloaded = CountsStore::load(&path).unwrap();
        assert_eq!(reloaded.get(key(1)), 3);
        assert_eq!(reloaded.get(key(2)), -2);
    }

    #[test]
    fn replace_all_overwrites_existing_entries() {
        let store = CountsStore::new();
        store.apply_delta(key(1), 5);
        store.replace_all(vec![(key(2), 7)]);
        assert_eq!(store.get(key(1)), 0);
        assert_eq!(store.get(key(2)), 7);
    }
}
