//! Index applier (spec §4.4 applier 6)
//!
//! The only applier that talks to the listener sinks registered through
//! [`crate::engine::EngineBuilder`]: the index-update listener on
//! schema commands, the node-label-update listener on node commands,
//! the relationship-type-update listener on relationship commands.
//! Each notification goes through that listener's own `WorkSync` queue
//! (spec §4.5) so concurrently applying batches serialize their
//! deliveries rather than racing the callback directly.

use super::{ApplyContext, CommandApplier};
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;

/// Notifies the registered listeners of committed schema/label/rel-type
/// changes.
pub struct IndexApplier;

impl CommandApplier for IndexApplier {
    fn apply(&self, command: &Command, ctx: &ApplyContext) -> Result<()> {
        match command {
            Command::Schema(change) => {
                if let (Some(sync), Some(after)) = (ctx.index_update_listener, &change.after) {
                    let token = after.label_or_rel_type;
                    sync.apply_async(move |listener| listener(token));
                }
            }
            Command::Node(change) => {
                if let Some(sync) = ctx.node_label_update_listener {
                    let labels: Vec<_> = change.after.as_ref().map(|n| n.labels.to_vec()).unwrap_or_default();
                    sync.apply_async(move |listener| {
                        for label in labels {
                            listener(label);
                        }
                    });
                }
            }
            Command::Relationship(change) => {
                if let (Some(sync), Some(after)) = (ctx.relationship_type_update_listener, &change.after) {
                    let token = after.rel_type;
                    sync.apply_async(move |listener| listener(token));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "index"
    }
}
