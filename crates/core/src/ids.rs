//! Record ids
//!
//! Every record store (§4.1 of the design) addresses its records by a
//! dense, monotonically-assigned `u64`. Each record kind gets its own
//! newtype so that a relationship id can never be passed where a node id
//! is expected — the compiler enforces the "fixed set of typed record
//! stores" invariant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// id `0` is reserved; every store's header occupies the low ids below
/// `RESERVED_LOW_IDS`.
pub const RESERVED_LOW_IDS: u64 = 1;

macro_rules! record_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw id.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// The raw id value.
            pub const fn id(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

record_id!(NodeId, "Identifies a record in the node store.");
record_id!(
    RelationshipId,
    "Identifies a record in the relationship store."
);
record_id!(
    RelationshipGroupId,
    "Identifies a record in the relationship-group store."
);
record_id!(PropertyId, "Identifies a record in the property store.");
record_id!(SchemaId, "Identifies a schema rule record.");
record_id!(TokenId, "Identifies a label, rel-type, or property-key token.");

/// A [`TokenId`] known to name a property key, kept distinct at the type
/// level so schema-rule property lists cannot accidentally hold a label
/// or rel-type token.
pub type PropertyKeyId = TokenId;

/// A [`TokenId`] known to name a relationship type.
pub type RelTypeId = TokenId;

/// A [`TokenId`] known to name a node label.
pub type LabelId = TokenId;

/// The fixed set of record kinds the engine manages (spec §2, C1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// `nodeStore`
    Node,
    /// `relationshipStore`
    Relationship,
    /// `relationshipGroupStore`
    RelationshipGroup,
    /// `propertyStore`
    Property,
    /// `propertyStringStore` (dynamic overflow chain for string values)
    DynamicString,
    /// `propertyArrayStore` (dynamic overflow chain for array values)
    DynamicArray,
    /// `schemaStore`
    Schema,
    /// `tokenStore` (shared by label / rel-type / property-key tokens)
    Token,
    /// `metaDataStore`
    MetaData,
}

/// A record id tagged with the kind of store it belongs to. Used where
/// code needs to refer to "some record" without committing to a
/// particular store's id newtype, e.g. in error messages and the
/// lock-verification check (§4.6d).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// Which store the id belongs to.
    pub kind: RecordKind,
    /// The raw id within that store.
    pub id: u64,
}

impl RecordId {
    /// Construct a tagged record id.
    pub const fn new(kind: RecordKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl From<NodeId> for RecordId {
    fn from(id: NodeId) -> Self {
        RecordId::new(RecordKind::Node, id.0)
    }
}

impl From<RelationshipId> for RecordId {
    fn from(id: RelationshipId) -> Self {
        RecordId::new(RecordKind::Relationship, id.0)
    }
}

impl From<RelationshipGroupId> for RecordId {
    fn from(id: RelationshipGroupId) -> Self {
        RecordId::new(RecordKind::RelationshipGroup, id.0)
    }
}

impl From<PropertyId> for RecordId {
    fn from(id: PropertyId) -> Self {
        RecordId::new(RecordKind::Property, id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_of_different_kinds_are_distinguishable_once_tagged() {
        let n: RecordId = NodeId::new(5).into();
        let r: RecordId = RelationshipId::new(5).into();
        assert_eq!(n.id, r.id);
        assert_ne!(n.kind, r.kind);
    }

    #[test]
    fn ordering_is_by_raw_id() {
        let mut ids = vec![NodeId::new(3), NodeId::new(1), NodeId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);
    }
}
