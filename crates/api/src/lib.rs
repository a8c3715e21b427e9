//! Public facade crate (spec §6).
//!
//! Everything here is a re-export of `graphkernel-engine`'s surface
//! plus the handful of lower-crate types callers need to name (ids,
//! records, commands, errors). A kernel built against this crate alone
//! never needs a direct dependency on `graphkernel-storage` or
//! `graphkernel-concurrency`.

#![warn(missing_docs)]

pub use graphkernel_core::command::{
    ChainDirection, Change, Command, ConstraintKind, CountsCmd, CountsKey, DegreesCmd, MetaDataCmd, NodeCmd,
    NodeRecord, PropertyCmd, PropertyRecord, RelationshipCmd, RelationshipGroupCmd, RelationshipGroupRecord,
    RelationshipRecord, SchemaCmd, SchemaRecord, TokenCmd, TokenRecord,
};
pub use graphkernel_core::error::{Error, Result};
pub use graphkernel_core::ids::{
    NodeId, PropertyId, RecordId, RecordKind, RelationshipGroupId, RelationshipId, SchemaId, TokenId,
};
pub use graphkernel_core::kernel_version::KernelVersion;
pub use graphkernel_core::mode::RecordLoadMode;
pub use graphkernel_core::token::TokenKind;
pub use graphkernel_core::value::PropertyValue;

pub use graphkernel_engine::{
    ApplicationMode, CommandCreationContext, CommandExtractor, Engine, EngineBuilder, EngineConfig,
    EngineConfigBuilder, IntegrityValidator, MetadataProvider, PropertyOwner, StorageFileInfo, StorageReader,
    TxStateVisitor, UpdateListener, UpgradeCoordinator, ValidationFailure, ValidationOutcome,
};

pub use graphkernel_schema::{SchemaCache, SchemaRule};
