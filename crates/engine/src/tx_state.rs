//! The `TxStateVisitor` contract (spec §4.3/§6)
//!
//! Implemented by the engine (see [`crate::command_creation::CommandCreationContext`]),
//! called by the kernel above while it iterates its own logical
//! transaction state. One method per logical change kind; a default
//! decorator may be wrapped around the engine's visitor (spec §6), so
//! every method takes `&mut self` rather than consuming it.

use graphkernel_core::command::ConstraintKind;
use graphkernel_core::error::Result;
use graphkernel_core::ids::{NodeId, PropertyId, RelationshipId, SchemaId, TokenId};
use graphkernel_core::token::TokenKind;
use graphkernel_core::value::PropertyValue;

/// The entity a property change targets. Property chains hang off
/// either a node or a relationship (spec §4.3 "Property chains").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOwner {
    /// A node's property chain.
    Node(NodeId),
    /// A relationship's property chain.
    Relationship(RelationshipId),
}

/// Visitor contract called once per logical change while the kernel
/// walks its transaction state.
pub trait TxStateVisitor {
    /// A new node was created, optionally with initial labels.
    fn visit_created_node(&mut self, id: NodeId, labels: &[TokenId]) -> Result<()>;

    /// An existing node was deleted.
    fn visit_deleted_node(&mut self, id: NodeId) -> Result<()>;

    /// A node's label set changed.
    fn visit_node_label_change(&mut self, id: NodeId, added: &[TokenId], removed: &[TokenId]) -> Result<()>;

    /// A new relationship was created between `start` and `end`.
    fn visit_created_relationship(
        &mut self,
        id: RelationshipId,
        rel_type: TokenId,
        start: NodeId,
        end: NodeId,
    ) -> Result<()>;

    /// An existing relationship was deleted.
    fn visit_deleted_relationship(&mut self, id: RelationshipId) -> Result<()>;

    /// A property on `owner` was added, changed, or removed. `value ==
    /// None` removes the property for `key`.
    fn visit_property_change(
        &mut self,
        owner: PropertyOwner,
        key: TokenId,
        value: Option<PropertyValue>,
    ) -> Result<()>;

    /// A new schema rule was created.
    fn visit_created_schema_rule(
        &mut self,
        id: SchemaId,
        kind: ConstraintKind,
        label_or_rel_type: TokenId,
        property_keys: &[TokenId],
    ) -> Result<()>;

    /// An existing schema rule was dropped.
    fn visit_dropped_schema_rule(&mut self, id: SchemaId) -> Result<()>;

    /// A new label, relationship-type, or property-key token was
    /// interned.
    fn visit_created_token(&mut self, id: TokenId, kind: TokenKind, name: &str) -> Result<()>;
}
