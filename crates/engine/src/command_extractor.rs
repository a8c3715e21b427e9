//! Command extraction (C7)
//!
//! Flattens a transaction's [`RecordState`] into the ordered
//! `Vec<Command>` the applier chain and the durability log both consume
//! (spec §4.3 "Command Extractor"). Order is fixed and deterministic:
//! an optional upgrade command first, then one group per record kind in
//! a stable kind order, each group ascending by id.

use crate::record_state::RecordState;
use graphkernel_core::command::Command;

/// Stateless extraction of a [`RecordState`] into its command batch.
pub struct CommandExtractor;

impl CommandExtractor {
    /// Flatten `state` into the ordered command batch a transaction
    /// commits. Returns an empty vec for an empty `state`.
    pub fn extract(state: &RecordState) -> Vec<Command> {
        let mut commands = Vec::new();

        if let Some(meta_data) = state.meta_data {
            commands.push(Command::MetaData(meta_data));
        }
        for change in state.schema.ascending() {
            commands.push(Command::Schema(change.clone()));
        }
        for change in state.tokens.ascending() {
            commands.push(Command::Token(change.clone()));
        }
        for change in state.nodes.ascending() {
            commands.push(Command::Node(change.clone()));
        }
        for change in state.relationships.ascending() {
            commands.push(Command::Relationship(change.clone()));
        }
        for change in state.relationship_groups.ascending() {
            commands.push(Command::RelationshipGroup(change.clone()));
        }
        for change in state.properties.ascending() {
            commands.push(Command::Property(change.clone()));
        }
        for (key, delta) in state.counts.ascending() {
            commands.push(Command::Counts(graphkernel_core::command::CountsCmd { key, delta }));
        }
        for degrees_cmd in state.degrees.ascending() {
            commands.push(Command::Degrees(degrees_cmd));
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_core::command::NodeRecord;
    use graphkernel_core::ids::{NodeId, TokenId};

    fn node(labels: &[u64]) -> NodeRecord {
        NodeRecord {
            next_rel: None,
            next_prop: None,
            labels: labels.iter().map(|&l| TokenId::new(l)).collect(),
            is_dense: false,
            relationship_group: None,
        }
    }

    #[test]
    fn empty_state_extracts_no_commands() {
        assert!(CommandExtractor::extract(&RecordState::new()).is_empty());
    }

    #[test]
    fn nodes_are_ordered_ascending_within_their_group() {
        let mut state = RecordState::new();
        for id in [3u64, 1, 2] {
            state
                .nodes
                .set_after(NodeId::new(id), Some(node(&[])), || Ok(None))
                .unwrap();
        }
        let commands = CommandExtractor::extract(&state);
        let ids: Vec<u64> = commands
            .iter()
            .map(|c| match c {
                Command::Node(change) => change.id.id(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn upgrade_command_always_comes_first() {
        use graphkernel_core::command::MetaDataCmd;
        use graphkernel_core::kernel_version::KernelVersion;

        let mut state = RecordState::new();
        state
            .nodes
            .set_after(NodeId::new(1), Some(node(&[])), || Ok(None))
            .unwrap();
        state.meta_data = Some(MetaDataCmd {
            before: KernelVersion::V0,
            after: KernelVersion::V1,
        });
        let commands = CommandExtractor::extract(&state);
        assert!(commands[0].is_upgrade());
    }
}
