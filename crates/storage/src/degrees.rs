//! Degrees store (C3)
//!
//! Per relationship-group, three accumulated `i64` counters — one per
//! [`ChainDirection`] — tracking how many relationships hang off the
//! group without requiring a full chain walk (spec §3, §4.4
//! `CountsApplier` also drives degree deltas). Dense nodes rely on this
//! store once their chains are too long to count by traversal.

use graphkernel_core::command::ChainDirection;
use graphkernel_core::ids::RelationshipGroupId;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
struct Degree {
    outgoing: i64,
    incoming: i64,
    loop_count: i64,
}

impl Degree {
    fn counter_mut(&mut self, direction: ChainDirection) -> &mut i64 {
        match direction {
            ChainDirection::Outgoing => &mut self.outgoing,
            ChainDirection::Incoming => &mut self.incoming,
            ChainDirection::Loop => &mut self.loop_count,
        }
    }

    fn counter(&self, direction: ChainDirection) -> i64 {
        match direction {
            ChainDirection::Outgoing => self.outgoing,
            ChainDirection::Incoming => self.incoming,
            ChainDirection::Loop => self.loop_count,
        }
    }
}

/// In-memory degrees store, keyed by relationship-group id.
pub struct DegreesStore {
    degrees: RwLock<BTreeMap<u64, Degree>>,
}

impl DegreesStore {
    /// An empty degrees store.
    pub fn new() -> Self {
        Self {
            degrees: RwLock::new(BTreeMap::new()),
        }
    }

    /// Accumulate `delta` into `group`'s counter for `direction`.
    pub fn apply_delta(&self, group: RelationshipGroupId, direction: ChainDirection, delta: i64) {
        let mut degrees = self.degrees.write();
        let entry = degrees.entry(group.id()).or_default();
        *entry.counter_mut(direction) += delta;
    }

    /// The current degree of `group` in `direction` (zero if untracked).
    pub fn get(&self, group: RelationshipGroupId, direction: ChainDirection) -> i64 {
        self.degrees
            .read()
            .get(&group.id())
            .map(|d| d.counter(direction))
            .unwrap_or(0)
    }

    /// Remove all counters for `group`, used when a relationship group
    /// record itself is deleted.
    pub fn remove(&self, group: RelationshipGroupId) {
        self.degrees.write().remove(&group.id());
    }

    /// Number of groups with tracked degrees.
    pub fn len(&self) -> usize {
        self.degrees.read().len()
    }

    /// True if no group has any tracked degree.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DegreesStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate_per_direction() {
        let store = DegreesStore::new();
        let group = RelationshipGroupId::new(1);
        store.apply_delta(group, ChainDirection::Outgoing, 3);
        store.apply_delta(group, ChainDirection::Outgoing, -1);
        store.apply_delta(group, ChainDirection::Incoming, 5);
        assert_eq!(store.get(group, ChainDirection::Outgoing), 2);
        assert_eq!(store.get(group, ChainDirection::Incoming), 5);
        assert_eq!(store.get(group, ChainDirection::Loop), 0);
    }

    #[test]
    fn untracked_group_reads_as_zero() {
        let store = DegreesStore::new();
        assert_eq!(
            store.get(RelationshipGroupId::new(99), ChainDirection::Loop),
            0
        );
    }

    #[test]
    fn remove_clears_group() {
        let store = DegreesStore::new();
        let group = RelationshipGroupId::new(1);
        store.apply_delta(group, ChainDirection::Outgoing, 4);
        store.remove(group);
        assert_eq!(store.get(group, ChainDirection::Outgoing), 0);
        assert!(store.is_empty());
    }
}
