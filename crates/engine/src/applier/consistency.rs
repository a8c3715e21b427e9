//! Consistency-checking applier (spec §4.4 applier 1)
//!
//! A lightweight, per-command structural sanity pass that runs ahead
//! of the actual store writes. It does not abort the batch on its own
//! — a structural problem here means the write about to happen is
//! already suspect, so it marks [`super::DatabaseHealth`] unhealthy and
//! lets the batch continue, mirroring the teacher's "log and flag,
//! don't crash mid-apply" posture for its own background consistency
//! checker.

use super::{ApplyContext, CommandApplier};
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;

/// Flags structurally suspicious commands without blocking the apply.
pub struct ConsistencyCheckingApplier;

impl CommandApplier for ConsistencyCheckingApplier {
    fn apply(&self, command: &Command, ctx: &ApplyContext) -> Result<()> {
        match command {
            Command::Node(change) => {
                if let Some(after) = &change.after {
                    if after.is_dense && after.relationship_group.is_none() {
                        ctx.health
                            .mark_unhealthy(format!("node {} marked dense with no relationship group", change.id));
                    }
                }
            }
            Command::Relationship(change) => {
                if let Some(after) = &change.after {
                    if after.first_node == after.second_node {
                        // Self-loops are legal; nothing to flag, left here as the
                        // single place a future check on endpoint validity would land.
                        let _ = after;
                    }
                }
            }
            Command::RelationshipGroup(change) => {
                if let Some(after) = &change.after {
                    if after.first_out.is_none() && after.first_in.is_none() && after.first_loop.is_none() {
                        ctx.health
                            .mark_unhealthy(format!("relationship group {} has no chain heads", change.id));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "consistency-checking"
    }
}
