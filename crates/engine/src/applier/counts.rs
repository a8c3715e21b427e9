//! Counts/degrees applier (spec §4.4 applier 5)
//!
//! Replays the accumulated, zero-net-filtered count and degree deltas
//! [`crate::command_extractor::CommandExtractor`] already collapsed
//! into single entries per key, onto [`graphkernel_storage::CountsStore`]
//! and [`graphkernel_storage::DegreesStore`].

use super::{ApplyContext, CommandApplier};
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;

/// Applies counts and degree deltas to their accumulator stores.
pub struct CountsApplier;

impl CommandApplier for CountsApplier {
    fn apply(&self, command: &Command, ctx: &ApplyContext) -> Result<()> {
        match command {
            Command::Counts(cmd) => {
                ctx.registry.counts.apply_delta(cmd.key, cmd.delta);
            }
            Command::Degrees(cmd) => {
                ctx.registry.degrees.apply_delta(cmd.group, cmd.direction, cmd.delta);
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::DatabaseHealth;
    use crate::mode::ApplicationMode;
    use graphkernel_core::command::CountsCmd;
    use graphkernel_core::ids::TokenId;
    use graphkernel_schema::SchemaCache;
    use graphkernel_storage::StoreRegistry;
    use tempfile::tempdir;

    #[test]
    fn applying_a_counts_delta_updates_the_store() {
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
        let key = graphkernel_core::command::CountsKey {
            label: Some(TokenId::new(1)),
            rel_type: None,
            other_label: None,
        };
        CountsApplier
            .apply(&Command::Counts(CountsCmd { key, delta: 3 }), &ctx)
            .unwrap();
        assert_eq!(registry.counts.get(key), 3);
    }
}
