//! High-id applier (spec §4.4 applier 3)
//!
//! When applying a batch whose ids did not originate from this
//! process's own id generators — a replicated write, or replay during
//! recovery — the id generators' high-water marks must be advanced to
//! at least the observed id, or a later local allocation could collide
//! with an id the batch just used. Only runs in
//! [`crate::mode::ApplicationMode::needs_high_id_tracking`] modes.
//! Property ids are tracked internally by [`graphkernel_storage::PropertyStore`]
//! itself and are not covered here.

use super::{ApplyContext, CommandApplier};
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;

/// Advances each record store's id generator past observed ids.
pub struct HighIdApplier;

impl CommandApplier for HighIdApplier {
    fn apply(&self, command: &Command, ctx: &ApplyContext) -> Result<()> {
        let registry = ctx.registry;
        match command {
            Command::Node(change) => registry.node_ids.mark(change.id.id()),
            Command::Relationship(change) => registry.relationship_ids.mark(change.id.id()),
            Command::RelationshipGroup(change) => registry.relationship_group_ids.mark(change.id.id()),
            Command::Schema(change) => registry.schema_ids.mark(change.id.id()),
            Command::Token(change) => registry.token_ids.mark(change.id.id()),
            Command::Property(_) | Command::MetaData(_) | Command::Counts(_) | Command::Degrees(_) => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "high-id"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::DatabaseHealth;
    use crate::mode::ApplicationMode;
    use graphkernel_core::command::{Change, NodeRecord};
    use graphkernel_core::ids::NodeId;
    use graphkernel_schema::SchemaCache;
    use graphkernel_storage::StoreRegistry;
    use tempfile::tempdir;

    #[test]
    fn marking_an_observed_node_id_advances_the_generator() {
        let dir = tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        let schema_cache = SchemaCache::new();
        let health = DatabaseHealth::new();
        let ctx = ApplyContext {
            registry: &registry,
            schema_cache: &schema_cache,
            health: &health,
            mode: ApplicationMode::Recovery,
            tx: 1,
            index_update_listener: None,
            node_label_update_listener: None,
            relationship_type_update_listener: None,
        };
        let change = Change {
            id: NodeId::new(41),
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
        HighIdApplier.apply(&Command::Node(change), &ctx).unwrap();
        assert!(registry.node_ids.high_id() >= 41);
    }
}
