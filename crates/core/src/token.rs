//! Token kinds
//!
//! Labels, relationship types, and property keys are all interned
//! strings stored in the shared token store, distinguished only by
//! `TokenKind` (spec §4.1: "tokenStore"). The schema cache indexes rules
//! by this same discriminator.

use serde::{Deserialize, Serialize};

/// Which namespace a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Node label, e.g. `:Person`.
    Label,
    /// Relationship type, e.g. `:KNOWS`.
    RelationshipType,
    /// Property key, e.g. `name`.
    PropertyKey,
}
