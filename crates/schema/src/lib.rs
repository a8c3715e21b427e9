//! Schema rule cache (C4)
//!
//! Keeps the committed set of existence/uniqueness/index rules in
//! memory with secondary indexes, so validation (C5) and command
//! extraction (C7) never have to scan the schema record store directly.

#![warn(missing_docs)]

pub mod cache;
pub mod rule;

pub use cache::SchemaCache;
pub use rule::SchemaRule;
