//! Core types for the transactional record storage engine
//!
//! This crate defines the foundational vocabulary shared by every other
//! crate in the workspace:
//! - record ids and the fixed set of record kinds (`ids`)
//! - the `(before, after)` command model that is the atomic unit of the
//!   durable log (`command`)
//! - the property value model carried on property records (`value`)
//! - the record-load access mode (`mode`)
//! - the kernel (on-disk format) version stamp and its total order
//!   (`kernel_version`)
//! - the unified error type for the engine (`error`)
//!
//! Nothing in this crate touches disk, locks, or threads: it is pure data
//! and the error taxonomy, so every other crate can depend on it without
//! pulling in I/O or concurrency machinery.

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod ids;
pub mod kernel_version;
pub mod mode;
pub mod token;
pub mod value;

pub use command::{
    Command, CountsCmd, DegreesCmd, MetaDataCmd, NodeCmd, PropertyCmd, RelationshipCmd,
    RelationshipGroupCmd, SchemaCmd, TokenCmd,
};
pub use error::{Error, Result};
pub use ids::{
    NodeId, PropertyId, PropertyKeyId, RecordId, RelationshipGroupId, RelationshipId, RelTypeId,
    SchemaId, TokenId,
};
pub use kernel_version::KernelVersion;
pub use mode::RecordLoadMode;
pub use token::TokenKind;
pub use value::PropertyValue;
