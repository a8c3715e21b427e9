//! Commands: the atomic unit of durable change
//!
//! A command carries a `(before, after)` pair for one record id plus a
//! format-version tag (spec §3 "Command"). `None` on either side means
//! "not in use" on that side of the mutation — a brand-new record has
//! `before: None`, a deleted record has `after: None`.
//!
//! Commands are immutable value types (design note: "commands are
//! immutable value types and do not need structural rewriting").

use crate::ids::{
    NodeId, PropertyId, RelationshipGroupId, RelationshipId, SchemaId, TokenId,
};
use crate::kernel_version::KernelVersion;
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The format-version tag every command carries, so a reader encountering
/// an unrecognised tag can raise `Error::FormatMismatch` instead of
/// misinterpreting the payload.
pub const CURRENT_COMMAND_FORMAT_VERSION: u8 = 1;

/// A node record's in-use payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// First relationship in this node's single chain representation.
    /// `None` once the node has transitioned to relationship groups, or
    /// if it has no relationships.
    pub next_rel: Option<RelationshipId>,
    /// First property in this node's property chain.
    pub next_prop: Option<PropertyId>,
    /// Labels currently attached to the node.
    pub labels: SmallVec<[TokenId; 4]>,
    /// Whether this node has crossed the dense-node threshold and uses
    /// relationship groups (`relationship_group` set) instead of a
    /// single chain (`next_rel`).
    pub is_dense: bool,
    /// First relationship-group record, valid only when `is_dense`.
    pub relationship_group: Option<RelationshipGroupId>,
}

/// A relationship record's in-use payload. Relationships are doubly
/// linked per endpoint (spec §4.3 "Relationship chains").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Start node.
    pub first_node: NodeId,
    /// End node.
    pub second_node: NodeId,
    /// Relationship type token.
    pub rel_type: TokenId,
    /// Previous relationship in `first_node`'s chain for this type.
    pub first_prev_rel: Option<RelationshipId>,
    /// Next relationship in `first_node`'s chain for this type.
    pub first_next_rel: Option<RelationshipId>,
    /// Previous relationship in `second_node`'s chain for this type.
    pub second_prev_rel: Option<RelationshipId>,
    /// Next relationship in `second_node`'s chain for this type.
    pub second_next_rel: Option<RelationshipId>,
    /// First property on this relationship.
    pub next_prop: Option<PropertyId>,
}

/// Which side of a relationship-group's per-type chain a record belongs
/// to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainDirection {
    /// Relationships where the dense node is the start node.
    Outgoing,
    /// Relationships where the dense node is the end node.
    Incoming,
    /// Self-loop relationships (dense node is both ends).
    Loop,
}

/// A relationship-group record's in-use payload. One group exists per
/// (dense node, relationship type) pair once a node is dense (spec §4.3
/// "Dense node threshold").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGroupRecord {
    /// The node this group belongs to.
    pub owning_node: NodeId,
    /// The relationship type this group indexes.
    pub rel_type: TokenId,
    /// First outgoing relationship of this type.
    pub first_out: Option<RelationshipId>,
    /// First incoming relationship of this type.
    pub first_in: Option<RelationshipId>,
    /// First self-loop relationship of this type.
    pub first_loop: Option<RelationshipId>,
    /// Next group record in this node's group chain (one group per
    /// relationship type, linked together).
    pub next: Option<RelationshipGroupId>,
}

/// A property record's in-use payload. Property chains are singly
/// linked lists of (key, value) blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// The property key.
    pub key: TokenId,
    /// The property value.
    pub value: PropertyValue,
    /// Next block in the owning entity's property chain.
    pub next: Option<PropertyId>,
}

/// The kind of schema rule a [`SchemaRecord`] encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Existence constraint: the property must be present.
    Existence,
    /// Uniqueness constraint, backed by an index.
    Uniqueness,
    /// A plain (non-constraint) index.
    Index,
}

/// A schema rule record's in-use payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRecord {
    /// What kind of rule this is.
    pub kind: ConstraintKind,
    /// The label or relationship-type token this rule is scoped to.
    pub label_or_rel_type: TokenId,
    /// The property keys this rule covers.
    pub property_keys: SmallVec<[TokenId; 4]>,
}

/// A token record's in-use payload: an interned name for a label,
/// relationship type, or property key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Which namespace this token belongs to.
    pub kind: crate::token::TokenKind,
    /// The interned name.
    pub name: String,
}

/// A counts-store key: `(label, rel-type, other-label)`, any component
/// `None` standing for `ANY_LABEL`/`ANY_TYPE` (spec §3 "Counts").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountsKey {
    /// Label side of the key, or `None` for `ANY_LABEL`.
    pub label: Option<TokenId>,
    /// Relationship-type side of the key, or `None` for `ANY_TYPE`.
    pub rel_type: Option<TokenId>,
    /// The other endpoint's label, or `None` for `ANY_LABEL`.
    pub other_label: Option<TokenId>,
}

/// Generic before/after change for a record kind identified by `id`.
/// `None` means "not in use" on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change<Id, R> {
    /// The id of the record this command mutates.
    pub id: Id,
    /// State before the transaction touched it, or `None` if the record
    /// was not in use (this is a brand-new record).
    pub before: Option<R>,
    /// State after the transaction, or `None` if the record has been
    /// deleted/freed.
    pub after: Option<R>,
    /// Format-version tag for this command's payload.
    pub format_version: u8,
}

impl<Id: Copy, R> Change<Id, R> {
    /// Build a change with the current format version.
    pub fn new(id: Id, before: Option<R>, after: Option<R>) -> Self {
        Self {
            id,
            before,
            after,
            format_version: CURRENT_COMMAND_FORMAT_VERSION,
        }
    }
}

/// A node mutation.
pub type NodeCmd = Change<NodeId, NodeRecord>;
/// A relationship mutation.
pub type RelationshipCmd = Change<RelationshipId, RelationshipRecord>;
/// A relationship-group mutation.
pub type RelationshipGroupCmd = Change<RelationshipGroupId, RelationshipGroupRecord>;
/// A property mutation.
pub type PropertyCmd = Change<PropertyId, PropertyRecord>;
/// A schema-rule mutation.
pub type SchemaCmd = Change<SchemaId, SchemaRecord>;
/// A token creation (tokens are never mutated or deleted once created).
pub type TokenCmd = Change<TokenId, TokenRecord>;

/// A counts-store delta. Unlike the record commands above, counts are
/// accumulated deltas rather than before/after snapshots (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountsCmd {
    /// The counter this delta applies to.
    pub key: CountsKey,
    /// The signed delta to accumulate.
    pub delta: i64,
}

/// A group-degree delta for a dense node's relationship group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreesCmd {
    /// The relationship group whose degree counter changes.
    pub group: RelationshipGroupId,
    /// Which of the group's three counters this delta applies to.
    pub direction: ChainDirection,
    /// The signed delta to accumulate.
    pub delta: i64,
}

/// The synthetic kernel-version transition command (spec §4.7). Always
/// the first command of the batch it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaDataCmd {
    /// The durable kernel version before the upgrade.
    pub before: KernelVersion,
    /// The kernel version the upgrade transitions to.
    pub after: KernelVersion,
}

/// The full set of command kinds the engine can emit (spec §3
/// "Command").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// See [`NodeCmd`].
    Node(NodeCmd),
    /// See [`RelationshipCmd`].
    Relationship(RelationshipCmd),
    /// See [`RelationshipGroupCmd`].
    RelationshipGroup(RelationshipGroupCmd),
    /// See [`PropertyCmd`].
    Property(PropertyCmd),
    /// See [`SchemaCmd`].
    Schema(SchemaCmd),
    /// See [`TokenCmd`].
    Token(TokenCmd),
    /// See [`CountsCmd`].
    Counts(CountsCmd),
    /// See [`DegreesCmd`].
    Degrees(DegreesCmd),
    /// See [`MetaDataCmd`].
    MetaData(MetaDataCmd),
}

impl Command {
    /// A short, stable tag naming this command's kind, used for
    /// ordering (spec §4.3) and for log/metric labels.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Command::Node(_) => "node",
            Command::Relationship(_) => "relationship",
            Command::RelationshipGroup(_) => "relationship_group",
            Command::Property(_) => "property",
            Command::Schema(_) => "schema",
            Command::Token(_) => "token",
            Command::Counts(_) => "counts",
            Command::Degrees(_) => "degrees",
            Command::MetaData(_) => "meta_data",
        }
    }

    /// True for the synthetic upgrade-transition command, which must
    /// always be the first command in a batch that contains one.
    pub fn is_upgrade(&self) -> bool {
        matches!(self, Command::MetaData(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_carries_current_format_version() {
        let c = NodeCmd::new(NodeId::new(1), None, None);
        assert_eq!(c.format_version, CURRENT_COMMAND_FORMAT_VERSION);
    }

    #[test]
    fn metadata_command_is_flagged_as_upgrade() {
        let cmd = Command::MetaData(MetaDataCmd {
            before: KernelVersion::V0,
            after: KernelVersion::V1,
        });
        assert!(cmd.is_upgrade());
        assert!(!Command::Node(NodeCmd::new(NodeId::new(1), None, None)).is_upgrade());
    }
}
