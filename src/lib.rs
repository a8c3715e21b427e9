//! # graphkernel
//!
//! A transactional record storage engine for a property-graph database:
//! fixed-size record stores for nodes, relationships, relationship
//! groups, properties, schema rules, and tokens; reusable id
//! allocation; an in-memory counts/degrees accumulator; a schema-rule
//! cache; and a mode-gated applier chain that replays committed
//! command batches onto the stores.
//!
//! # Quick Start
//!
//! ```no_run
//! use graphkernel::{Engine, EngineConfig, KernelVersion, NodeId, TokenId, TxStateVisitor};
//!
//! fn main() -> graphkernel::Result<()> {
//!     let engine = Engine::builder("./my-graph", EngineConfig::default(), KernelVersion::LATEST)
//!         .build()?;
//!
//!     let mut ctx = engine.new_command_creation_context();
//!     ctx.visit_created_node(NodeId::new(1), &[TokenId::new(1)])?;
//!     let commands = engine.create_commands(ctx)?;
//!     engine.apply(&commands, graphkernel::ApplicationMode::Internal, 1)?;
//!
//!     let reader = engine.new_reader();
//!     assert!(reader.node(NodeId::new(1))?.is_some());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! [`Engine`] is the single entry point. Internal crates (`storage`,
//! `schema`, `concurrency`, `durability`) are not exposed directly;
//! everything a caller needs is re-exported from `graphkernel-api`.

pub use graphkernel_api::*;
