//! Schema rule value type
//!
//! The cacheable projection of a [`graphkernel_core::command::SchemaRecord`]:
//! same fields, plus the id that names it, since the cache indexes rules
//! by id as its primary key.

use graphkernel_core::command::ConstraintKind;
use graphkernel_core::ids::{SchemaId, TokenId};
use smallvec::SmallVec;

/// A schema rule as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRule {
    /// The rule's own id.
    pub id: SchemaId,
    /// Existence, uniqueness, or index.
    pub kind: ConstraintKind,
    /// The label (node rules) or relationship type (relationship rules)
    /// this rule applies to.
    pub label_or_rel_type: TokenId,
    /// The property keys this rule constrains.
    pub property_keys: SmallVec<[TokenId; 4]>,
}
