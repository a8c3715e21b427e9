//! In-memory schema cache (C4)
//!
//! One primary map plus four secondary multimaps, the same shape as the
//! teacher's `RunIndex`/`TypeIndex` pair generalized to four dimensions
//! instead of one: rules are looked up by id, but also need to be
//! listable by label, by relationship type, by property key, and by
//! constraint kind without a linear scan.

use crate::rule::SchemaRule;
use graphkernel_core::command::{ConstraintKind, SchemaCmd};
use graphkernel_core::ids::{SchemaId, TokenId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Default)]
struct Indexes {
    rules: HashMap<SchemaId, SchemaRule>,
    by_label_or_rel_type: HashMap<TokenId, HashSet<SchemaId>>,
    by_property_key: HashMap<TokenId, HashSet<SchemaId>>,
    by_kind: HashMap<ConstraintKind, HashSet<SchemaId>>,
}

impl Indexes {
    fn insert(&mut self, rule: SchemaRule) {
        self.by_label_or_rel_type
            .entry(rule.label_or_rel_type)
            .or_default()
            .insert(rule.id);
        self.by_kind.entry(rule.kind).or_default().insert(rule.id);
        for key in &rule.property_keys {
            self.by_property_key.entry(*key).or_default().insert(rule.id);
        }
        self.rules.insert(rule.id, rule);
    }

    fn remove(&mut self, id: SchemaId) {
        let Some(rule) = self.rules.remove(&id) else {
            return;
        };
        if let Some(set) = self.by_label_or_rel_type.get_mut(&rule.label_or_rel_type) {
            set.remove(&id);
            if set.is_empty() {
                self.by_label_or_rel_type.remove(&rule.label_or_rel_type);
            }
        }
        if let Some(set) = self.by_kind.get_mut(&rule.kind) {
            set.remove(&id);
            if set.is_empty() {
                self.by_kind.remove(&rule.kind);
            }
        }
        for key in &rule.property_keys {
            if let Some(set) = self.by_property_key.get_mut(key) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_property_key.remove(key);
                }
            }
        }
    }
}

/// The cache of schema rules the engine consults on every write that
/// touches labels, relationship types, or properties.
///
/// Reads take a cheap [`parking_lot::RwLock`] read guard; the only
/// mutator is [`Self::apply`], called by the cache-invalidation applier
/// (spec §4.4 applier #4) under a write guard.
pub struct SchemaCache {
    indexes: RwLock<Indexes>,
}

impl SchemaCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(Indexes::default()),
        }
    }

    /// Apply one committed schema change: insert, update, or remove a
    /// rule depending on whether `before`/`after` are present.
    pub fn apply(&self, cmd: &SchemaCmd) {
        let mut indexes = self.indexes.write();
        if cmd.before.is_some() {
            indexes.remove(cmd.id);
        }
        if let Some(after) = &cmd.after {
            debug!(schema_id = cmd.id.id(), kind = ?after.kind, "schema rule installed");
            indexes.insert(SchemaRule {
                id: cmd.id,
                kind: after.kind,
                label_or_rel_type: after.label_or_rel_type,
                property_keys: after.property_keys.clone(),
            });
        }
    }

    /// The rule with this id, if present.
    pub fn get(&self, id: SchemaId) -> Option<SchemaRule> {
        self.indexes.read().rules.get(&id).cloned()
    }

    /// Every rule scoped to `label_or_rel_type`.
    pub fn rules_for_label_or_rel_type(&self, label_or_rel_type: TokenId) -> Vec<SchemaRule> {
        self.collect(&self.indexes.read().by_label_or_rel_type, label_or_rel_type)
    }

    /// Every rule that constrains `property_key`.
    pub fn rules_for_property_key(&self, property_key: TokenId) -> Vec<SchemaRule> {
        self.collect(&self.indexes.read().by_property_key, property_key)
    }

    /// Every rule of a given constraint kind.
    pub fn rules_of_kind(&self, kind: ConstraintKind) -> Vec<SchemaRule> {
        let indexes = self.indexes.read();
        indexes
            .by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|id| indexes.rules.get(id).cloned())
            .collect()
    }

    fn collect(&self, index: &HashMap<TokenId, HashSet<SchemaId>>, key: TokenId) -> Vec<SchemaRule> {
        let indexes = self.indexes.read();
        index
            .get(&key)
            .into_iter()
            .flatten()
            .filter_map(|id| indexes.rules.get(id).cloned())
            .collect()
    }

    /// Total rules currently cached.
    pub fn len(&self) -> usize {
        self.indexes.read().rules.len()
    }

    /// True if no rules are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_core::command::{Change, SchemaRecord};
    use smallvec::SmallVec;

    fn rule_record(kind: ConstraintKind, label: u64, keys: &[u64]) -> SchemaRecord {
        SchemaRecord {
            kind,
            label_or_rel_type: TokenId::new(label),
            property_keys: keys.iter().map(|k| TokenId::new(*k)).collect::<SmallVec<_>>(),
        }
    }

    #[test]
    fn insert_makes_rule_visible_in_every_index() {
        let cache = SchemaCache::new();
        let id = SchemaId::new(1);
        let cmd = Change::new(id, None, Some(rule_record(ConstraintKind::Existence, 10, &[1, 2])));
        cache.apply(&cmd);

        assert!(cache.get(id).is_some());
        assert_eq!(cache.rules_for_label_or_rel_type(TokenId::new(10)).len(), 1);
        assert_eq!(cache.rules_for_property_key(TokenId::new(1)).len(), 1);
        assert_eq!(cache.rules_of_kind(ConstraintKind::Existence).len(), 1);
    }

    #[test]
    fn remove_clears_every_index() {
        let cache = SchemaCache::new();
        let id = SchemaId::new(1);
        let before = rule_record(ConstraintKind::Uniqueness, 10, &[1]);
        cache.apply(&Change::new(id, None, Some(before.clone())));
        cache.apply(&Change::new(id, Some(before), None));

        assert!(cache.get(id).is_none());
        assert!(cache.rules_for_label_or_rel_type(TokenId::new(10)).is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn update_replaces_index_membership() {
        let cache = SchemaCache::new();
        let id = SchemaId::new(1);
        let before = rule_record(ConstraintKind::Index, 10, &[1]);
        let after = rule_record(ConstraintKind::Index, 20, &[2]);
        cache.apply(&Change::new(id, None, Some(before.clone())));
        cache.apply(&Change::new(id, Some(before), Some(after)));

        assert!(cache.rules_for_label_or_rel_type(TokenId::new(10)).is_empty());
        assert_eq!(cache.rules_for_label_or_rel_type(TokenId::new(20)).len(), 1);
        assert!(cache.rules_for_property_key(TokenId::new(1)).is_empty());
        assert_eq!(cache.rules_for_property_key(TokenId::new(2)).len(), 1);
    }
}
