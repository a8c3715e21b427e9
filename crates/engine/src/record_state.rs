//! Transaction record state (C6)
//!
//! A mutable staging buffer keyed by record id per store (spec §3
//! "Record State"). First touch of an id reads the current record
//! through a caller-supplied loader as `before`; every edit after that
//! only updates `after`. The struct itself never talks to a store
//! directly — [`crate::engine::CommandCreationContext`] supplies the
//! loader closures, keeping this module ignorant of `graphkernel-storage`.

use graphkernel_core::command::{
    Change, CountsKey, DegreesCmd, NodeRecord, PropertyRecord, RelationshipGroupRecord,
    RelationshipRecord, SchemaRecord, TokenRecord,
};
use graphkernel_core::command::{ChainDirection, MetaDataCmd};
use graphkernel_core::error::Result;
use graphkernel_core::ids::{
    NodeId, PropertyId, RelationshipGroupId, RelationshipId, SchemaId, TokenId,
};
use std::collections::HashMap;
use std::hash::Hash;

/// Per-store staging map: one `before`/`after` pair per touched id.
pub struct RecordChanges<Id, R> {
    entries: HashMap<Id, Change<Id, R>>,
}

impl<Id, R> RecordChanges<Id, R>
where
    Id: Copy + Eq + Hash,
    R: Clone,
{
    /// An empty staging map.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Touch `id`, loading its current value as `before` on first touch
    /// only. Returns the change entry so callers can set `after`.
    pub fn load_or_create(
        &mut self,
        id: Id,
        load: impl FnOnce() -> Result<Option<R>>,
    ) -> Result<&mut Change<Id, R>> {
        if !self.entries.contains_key(&id) {
            let before = load()?;
            let after = before.clone();
            self.entries.insert(id, Change::new(id, before, after));
        }
        Ok(self.entries.get_mut(&id).unwrap())
    }

    /// Set the after-state for `id`, loading `before` first if this is
    /// the first touch.
    pub fn set_after(
        &mut self,
        id: Id,
        after: Option<R>,
        load: impl FnOnce() -> Result<Option<R>>,
    ) -> Result<()> {
        let change = self.load_or_create(id, load)?;
        change.after = after;
        Ok(())
    }

    /// The staged change for `id`, if it has been touched.
    pub fn get(&self, id: Id) -> Option<&Change<Id, R>> {
        self.entries.get(&id)
    }

    /// Every staged change, ordered by ascending id (spec §4.3 "within
    /// each kind, commands are ordered by ascending id").
    pub fn ascending(&self) -> Vec<&Change<Id, R>>
    where
        Id: Ord,
    {
        let mut changes: Vec<_> = self.entries.values().collect();
        changes.sort_by_key(|c| c.id);
        changes
    }

    /// Number of ids touched this transaction.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no id in this store has been touched.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<Id, R> Default for RecordChanges<Id, R>
where
    Id: Copy + Eq + Hash,
    R: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulated counts-store deltas for one transaction. Unlike the
/// record stores, counts are deltas rather than before/after snapshots
/// (spec §3 "Counts"), so repeated touches of the same key within a
/// transaction merge additively instead of overwriting.
#[derive(Default)]
pub struct CountsChanges {
    deltas: HashMap<CountsKeyOrd, i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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

impl CountsChanges {
    /// Accumulate `delta` into `key`'s running total for this transaction.
    pub fn apply_delta(&mut self, key: CountsKey, delta: i64) {
        *self.deltas.entry(CountsKeyOrd(key)).or_insert(0) += delta;
    }

    /// Every non-zero accumulated delta, ordered for deterministic
    /// command emission.
    pub fn ascending(&self) -> Vec<(CountsKey, i64)> {
        let mut entries: Vec<_> = self
            .deltas
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(k, v)| (k.tuple(), k.0, *v))
            .collect();
        entries.sort_by_key(|(tuple, _, _)| *tuple);
        entries.into_iter().map(|(_, k, v)| (k, v)).collect()
    }

    /// True if no non-zero delta is staged.
    pub fn is_empty(&self) -> bool {
        self.deltas.values().all(|d| *d == 0)
    }
}

/// Accumulated group-degree deltas for one transaction.
#[derive(Default)]
pub struct DegreesChanges {
    deltas: HashMap<(RelationshipGroupId, ChainDirectionKey), i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ChainDirectionKey(u8);

impl From<ChainDirection> for ChainDirectionKey {
    fn from(d: ChainDirection) -> Self {
        ChainDirectionKey(match d {
            ChainDirection::Outgoing => 0,
            ChainDirection::Incoming => 1,
            ChainDirection::Loop => 2,
        })
    }
}

impl DegreesChanges {
    /// Accumulate `delta` into `group`'s counter for `direction`.
    pub fn apply_delta(&mut self, group: RelationshipGroupId, direction: ChainDirection, delta: i64) {
        *self.deltas.entry((group, direction.into())).or_insert(0) += delta;
    }

    /// Every non-zero accumulated delta as [`DegreesCmd`]s, ordered by
    /// ascending group id then direction.
    pub fn ascending(&self) -> Vec<DegreesCmd> {
        let mut entries: Vec<_> = self
            .deltas
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|((group, dir), delta)| (group.id(), dir.0, *group, *delta, dir.0))
            .collect();
        entries.sort_by_key(|(id, dir, ..)| (*id, *dir));
        entries
            .into_iter()
            .map(|(_, dir_raw, group, delta, _)| DegreesCmd {
                group,
                direction: match dir_raw {
                    0 => ChainDirection::Outgoing,
                    1 => ChainDirection::Incoming,
                    _ => ChainDirection::Loop,
                },
                delta,
            })
            .collect()
    }

    /// True if no non-zero delta is staged.
    pub fn is_empty(&self) -> bool {
        self.deltas.values().all(|d| *d == 0)
    }
}

/// Every store's staging buffer for one transaction, aggregated for the
/// command extractor (spec §3 "Record State").
#[derive(Default)]
pub struct RecordState {
    /// Staged node changes.
    pub nodes: RecordChanges<NodeId, NodeRecord>,
    /// Staged relationship changes.
    pub relationships: RecordChanges<RelationshipId, RelationshipRecord>,
    /// Staged relationship-group changes.
    pub relationship_groups: RecordChanges<RelationshipGroupId, RelationshipGroupRecord>,
    /// Staged property changes.
    pub properties: RecordChanges<PropertyId, PropertyRecord>,
    /// Staged schema-rule changes.
    pub schema: RecordChanges<SchemaId, SchemaRecord>,
    /// Staged token creations.
    pub tokens: RecordChanges<TokenId, TokenRecord>,
    /// Accumulated counts deltas.
    pub counts: CountsChanges,
    /// Accumulated degree deltas.
    pub degrees: DegreesChanges,
    /// The synthetic upgrade command, if one was prepended (spec §4.7).
    pub meta_data: Option<MetaDataCmd>,
    /// For every node this transaction deleted, its record as last seen
    /// live (after every earlier edit this same transaction staged,
    /// including relationship unlinks) the instant before `after` was
    /// set to `None`. `before` alone cannot answer "does this node still
    /// own a relationship" once the node is being deleted, because it is
    /// frozen at the pre-transaction snapshot and never reflects this
    /// transaction's own chain unlinks.
    pub deleted_nodes_last_seen: HashMap<NodeId, NodeRecord>,
}

impl RecordState {
    /// A fresh, empty record state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if nothing at all was staged (no commands will be emitted).
    pub fn is_empty(&self) -> bool {
        self.meta_data.is_none()
            && self.nodes.is_empty()
            && self.relationships.is_empty()
            && self.relationship_groups.is_empty()
            && self.properties.is_empty()
            && self.schema.is_empty()
            && self.tokens.is_empty()
            && self.counts.is_empty()
            && self.degrees.is_empty()
    }
}
