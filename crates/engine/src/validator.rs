//! Integrity validator (C5, spec §4.6)
//!
//! Runs a fixed set of checks against a staged [`RecordState`] before
//! its commands are handed to the applier chain. Accumulates every
//! failure found rather than stopping at the first one, following the
//! teacher's OCC validator's accumulate-then-merge style
//! (`ValidationResult`/`merge` in its transaction validation module).

use crate::record_state::RecordState;
use graphkernel_concurrency::locks::LockService;
use graphkernel_core::command::ConstraintKind;
use graphkernel_core::ids::{NodeId, RecordId, RecordKind};
use graphkernel_core::kernel_version::KernelVersion;
use graphkernel_schema::SchemaCache;
use std::time::Duration;

/// One check's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// A node was deleted while still having relationships attached,
    /// either via its sparse chain or a relationship group (spec §4.6a
    /// "a node cannot be deleted while it still owns relationships").
    NodeStillHasRelationships(NodeId),
    /// A schema rule was created naming no property keys, which can
    /// never be satisfied (spec §4.6b "structural preconditions").
    SchemaRuleHasNoPropertyKeys,
    /// A uniqueness or key constraint was scoped to more than one
    /// property key, which this engine does not support (spec §4.6b).
    CompositeUniquenessUnsupported,
    /// The upgrade command's before/after versions are not both in the
    /// recognised version set, or are not strictly increasing (spec
    /// §4.6c).
    InvalidUpgradeTransition {
        /// The staged "before" version.
        before: KernelVersion,
        /// The staged "after" version.
        after: KernelVersion,
    },
    /// A record this transaction mutated is not covered by a lock it
    /// holds (spec §4.6d "lock-verification mode").
    MissingLock(RecordId),
}

/// Every failure a validation pass found. Empty means the batch may
/// proceed to the applier chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// The failures found, in the order their checks ran.
    pub failures: Vec<ValidationFailure>,
}

impl ValidationOutcome {
    fn merge(&mut self, mut other: ValidationOutcome) {
        self.failures.append(&mut other.failures);
    }

    /// True if no check reported a failure.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the integrity checks spec §4.6 names against a staged
/// [`RecordState`].
pub struct IntegrityValidator;

impl IntegrityValidator {
    /// Run every structural check that does not require a lock
    /// service: node-deletion-owns-no-relationships, schema-rule
    /// preconditions, and upgrade-transition validity.
    pub fn validate(state: &RecordState, schema_cache: &SchemaCache) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        outcome.merge(Self::check_deleted_nodes_have_no_relationships(state));
        outcome.merge(Self::check_schema_rule_preconditions(state, schema_cache));
        outcome.merge(Self::check_upgrade_transition(state));
        outcome
    }

    /// Additionally run lock-verification mode: every record this
    /// transaction's batch mutates must be covered by a lock `tx`
    /// holds (spec §4.6d). Used in testing and debug builds, not on
    /// every commit in production.
    pub fn validate_with_locks(
        state: &RecordState,
        schema_cache: &SchemaCache,
        locks: &dyn LockService,
        tx: u64,
    ) -> ValidationOutcome {
        let mut outcome = Self::validate(state, schema_cache);
        outcome.merge(Self::check_locks_held(state, locks, tx));
        outcome
    }

    fn check_deleted_nodes_have_no_relationships(state: &RecordState) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        for (id, last_seen) in &state.deleted_nodes_last_seen {
            if last_seen.next_rel.is_some() || last_seen.relationship_group.is_some() {
                outcome.failures.push(ValidationFailure::NodeStillHasRelationships(*id));
            }
        }
        outcome
    }

    fn check_schema_rule_preconditions(state: &RecordState, _schema_cache: &SchemaCache) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        for change in state.schema.ascending() {
            let Some(after) = &change.after else {
                continue;
            };
            if after.property_keys.is_empty() {
                outcome.failures.push(ValidationFailure::SchemaRuleHasNoPropertyKeys);
                continue;
            }
            let is_uniqueness_like = matches!(after.kind, ConstraintKind::Uniqueness);
            if is_uniqueness_like && after.property_keys.len() > 1 {
                outcome.failures.push(ValidationFailure::CompositeUniquenessUnsupported);
            }
        }
        outcome
    }

    fn check_upgrade_transition(state: &RecordState) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        if let Some(cmd) = state.meta_data {
            if cmd.after <= cmd.before {
                outcome.failures.push(ValidationFailure::InvalidUpgradeTransition {
                    before: cmd.before,
                    after: cmd.after,
                });
            }
        }
        outcome
    }

    fn check_locks_held(state: &RecordState, locks: &dyn LockService, tx: u64) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        for change in state.nodes.ascending() {
            let record = RecordId::new(RecordKind::Node, change.id.id());
            if !locks.holds(record, tx) {
                outcome.failures.push(ValidationFailure::MissingLock(record));
            }
        }
        for change in state.relationships.ascending() {
            let record = RecordId::new(RecordKind::Relationship, change.id.id());
            if !locks.holds(record, tx) {
                outcome.failures.push(ValidationFailure::MissingLock(record));
            }
        }
        outcome
    }
}

/// Bounded-wait timeout the upgrade coordinator and lock-verification
/// checks share when acquiring a lock before giving up (spec §4.6d,
/// §4.7).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_concurrency::locks::NoopLockService;
    use graphkernel_core::command::{MetaDataCmd, NodeRecord, SchemaRecord};
    use graphkernel_core::ids::{SchemaId, TokenId};
    use smallvec::smallvec;

    fn dense_node(has_relationships: bool) -> NodeRecord {
        NodeRecord {
            next_rel: if has_relationships { Some(graphkernel_core::ids::RelationshipId::new(1)) } else { None },
            next_prop: None,
            labels: Default::default(),
            is_dense: false,
            relationship_group: None,
        }
    }

    #[test]
    fn deleting_a_node_with_relationships_fails() {
        let mut state = RecordState::new();
        state.deleted_nodes_last_seen.insert(NodeId::new(1), dense_node(true));
        let outcome = IntegrityValidator::validate(&state, &SchemaCache::new());
        assert!(outcome.failures.contains(&ValidationFailure::NodeStillHasRelationships(NodeId::new(1))));
    }

    #[test]
    fn deleting_a_node_with_no_relationships_succeeds() {
        let mut state = RecordState::new();
        state.deleted_nodes_last_seen.insert(NodeId::new(1), dense_node(false));
        let outcome = IntegrityValidator::validate(&state, &SchemaCache::new());
        assert!(outcome.is_valid());
    }

    #[test]
    fn relationships_deleted_in_the_same_transaction_do_not_block_node_deletion() {
        // A node whose `before` snapshot still owned a relationship, but
        // whose live state (captured by `visit_deleted_node` right
        // before deletion) has already been unlinked by this same
        // transaction's own `visit_deleted_relationship` call.
        let mut state = RecordState::new();
        state
            .nodes
            .set_after(NodeId::new(1), None, || Ok(Some(dense_node(true))))
            .unwrap();
        state.deleted_nodes_last_seen.insert(NodeId::new(1), dense_node(false));
        let outcome = IntegrityValidator::validate(&state, &SchemaCache::new());
        assert!(outcome.is_valid());
    }

    #[test]
    fn schema_rule_with_no_property_keys_fails() {
        let mut state = RecordState::new();
        state
            .schema
            .set_after(
                SchemaId::new(1),
                Some(SchemaRecord {
                    kind: ConstraintKind::Existence,
                    label_or_rel_type: TokenId::new(1),
                    property_keys: smallvec![],
                }),
                || Ok(None),
            )
            .unwrap();
        let outcome = IntegrityValidator::validate(&state, &SchemaCache::new());
        assert!(outcome.failures.contains(&ValidationFailure::SchemaRuleHasNoPropertyKeys));
    }

    #[test]
    fn non_increasing_upgrade_fails() {
        let mut state = RecordState::new();
        state.meta_data = Some(MetaDataCmd {
            before: KernelVersion::V1,
            after: KernelVersion::V0,
        });
        let outcome = IntegrityValidator::validate(&state, &SchemaCache::new());
        assert!(matches!(
            outcome.failures[0],
            ValidationFailure::InvalidUpgradeTransition { .. }
        ));
    }

    #[test]
    fn noop_lock_service_always_satisfies_lock_verification() {
        let mut state = RecordState::new();
        state
            .nodes
            .set_after(NodeId::new(1), Some(dense_node(false)), || Ok(None))
            .unwrap();
        let outcome = IntegrityValidator::validate_with_locks(&state, &SchemaCache::new(), &NoopLockService, 1);
        assert!(outcome.is_valid());
    }
}
