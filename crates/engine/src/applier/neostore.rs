//! Record-store applier (spec §4.4 applier 2, "NeoStoreApplier")
//!
//! Writes each command's staged `after` record to its backing
//! [`RecordStore`] (or frees it when `after` is `None`), and bridges
//! the logical `Property` command — a flat `PropertyRecord{key,value,
//! next}` — onto [`PropertyStore`]'s own inline-vs-dynamic-chain
//! encoding. This is the only applier that touches the durable record
//! files directly; every other applier reads back through the stores
//! it just wrote.

use super::{ApplyContext, CommandApplier};
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;

/// Replays each command's before/after delta onto its record store.
pub struct NeoStoreApplier;

impl CommandApplier for NeoStoreApplier {
    fn apply(&self, command: &Command, ctx: &ApplyContext) -> Result<()> {
        let registry = ctx.registry;
        match command {
            Command::Node(change) => registry.nodes.write(change.id.id(), change.after.as_ref()),
            Command::Relationship(change) => registry.relationships.write(change.id.id(), change.after.as_ref()),
            Command::RelationshipGroup(change) => {
                registry.relationship_groups.write(change.id.id(), change.after.as_ref())
            }
            Command::Schema(change) => registry.schema.write(change.id.id(), change.after.as_ref()),
            Command::Token(change) => registry.tokens.write(change.id.id(), change.after.as_ref()),
            Command::Property(change) => match &change.after {
                Some(record) => registry.properties.write(change.id, record.key, &record.value, record.next),
                None => registry.properties.delete(change.id, ctx.tx),
            },
            Command::MetaData(cmd) => {
                let mut record = registry
                    .read_meta_data()?
                    .unwrap_or(graphkernel_storage::format::MetaDataRecord {
                        kernel_version: cmd.before,
                        store_id: 0,
                        creation_time: 0,
                    });
                record.kernel_version = cmd.after;
                registry.write_meta_data(&record)
            }
            Command::Counts(_) | Command::Degrees(_) => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "neostore"
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
    fn writing_a_node_command_persists_it_to_the_node_store() {
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
        let record = NodeRecord {
            next_rel: None,
            next_prop: None,
            labels: Default::default(),
            is_dense: false,
            relationship_group: None,
        };
        let change = Change {
            id: NodeId::new(1),
            before: None,
            after: Some(record),
            format_version: 0,
        };
        NeoStoreApplier.apply(&Command::Node(change), &ctx).unwrap();
        let stored = registry
            .nodes
            .read(1, graphkernel_core::mode::RecordLoadMode::Normal)
            .unwrap();
        assert!(stored.is_some());
    }
}
