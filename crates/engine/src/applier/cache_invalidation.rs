//! Cache-invalidation applier (spec §4.4 applier 4)
//!
//! Keeps [`graphkernel_schema::SchemaCache`] in sync with committed
//! schema-rule changes: the previous rule's index entry is dropped and
//! the new one installed, so the next transaction's validator sees
//! exactly what just committed. Gated by
//! [`crate::mode::ApplicationMode::needs_cache_invalidation_on_updates`].

use super::{ApplyContext, CommandApplier};
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;

/// Invalidates and repopulates the in-memory schema cache.
pub struct CacheInvalidationApplier;

impl CommandApplier for CacheInvalidationApplier {
    fn apply(&self, command: &Command, ctx: &ApplyContext) -> Result<()> {
        if let Command::Schema(cmd) = command {
            ctx.schema_cache.apply(cmd);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cache-invalidation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::DatabaseHealth;
    use crate::mode::ApplicationMode;
    use graphkernel_core::command::{Change, ConstraintKind, SchemaRecord};
    use graphkernel_core::ids::{SchemaId, TokenId};
    use graphkernel_schema::SchemaCache;
    use graphkernel_storage::StoreRegistry;
    use smallvec::smallvec;
    use tempfile::tempdir;

    #[test]
    fn applying_a_schema_command_installs_the_rule_in_the_cache() {
        let dir = tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        let schema_cache = SchemaCache::new();
        let health = DatabaseHealth::new();
        let ctx = ApplyContext {
            registry: &registry,
            schema_cache: &schema_cache,
            health: &health,
            mode: ApplicationMode::Internal,
            tx: 1,
            index_update_listener: None,
            node_label_update_listener: None,
            relationship_type_update_listener: None,
        };
        let change = Change::new(
            SchemaId::new(1),
            None,
            Some(SchemaRecord {
                kind: ConstraintKind::Existence,
                label_or_rel_type: TokenId::new(1),
                property_keys: smallvec![TokenId::new(2)],
            }),
        );
        CacheInvalidationApplier.apply(&Command::Schema(change), &ctx).unwrap();
        assert_eq!(schema_cache.len(), 1);
    }

    #[test]
    fn applying_a_non_schema_command_never_touches_health() {
        let dir = tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        let schema_cache = SchemaCache::new();
        let health = DatabaseHealth::new();
        let ctx = ApplyContext {
            registry: &registry,
            schema_cache: &schema_cache,
            health: &health,
            mode: ApplicationMode::Internal,
            tx: 1,
            index_update_listener: None,
            node_label_update_listener: None,
            relationship_type_update_listener: None,
        };
        use graphkernel_core::command::{Change as NodeChange, NodeRecord};
        use graphkernel_core::ids::NodeId;
        let change = NodeChange {
            id: NodeId::new(1),
            before: None,
            after: Some(NodeRecord {
                next_rel: None,
                next_prop: None,
                labels: Default::default(),
                is_dense: false,
                relationship_group: None,
            }),
            format_version: 0,
        };
        CacheInvalidationApplier.apply(&Command::Node(change), &ctx).unwrap();
        assert!(health.is_healthy());
    }
}
