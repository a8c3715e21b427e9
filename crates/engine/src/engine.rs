//! Public engine surface (spec §6 "External Interfaces")
//!
//! [`Engine`] is what the kernel above opens once per database. It is
//! built through [`EngineBuilder`] and immutable afterwards — listener
//! registration happens during the builder phase rather than through
//! single-shot post-construction mutation, per the re-architecture note
//! against "listener single-registration via state mutation."

use crate::applier::{ApplierChain, ApplyContext, DatabaseHealth};
use crate::command_creation::CommandCreationContext;
use crate::command_extractor::CommandExtractor;
use crate::config::EngineConfig;
use crate::mode::ApplicationMode;
use crate::upgrade::UpgradeCoordinator;
use crate::validator::IntegrityValidator;
use graphkernel_concurrency::locks::{LockService, NoopLockService, RecordLockService};
use graphkernel_concurrency::upgrade_lock::UpgradeLock;
use graphkernel_concurrency::WorkSync;
use graphkernel_core::command::{Command, MetaDataCmd, NodeRecord, PropertyRecord, RelationshipGroupRecord, RelationshipRecord, SchemaRecord, TokenRecord};
use graphkernel_core::error::{Error, Result};
use graphkernel_core::ids::{NodeId, PropertyId, RelationshipGroupId, RelationshipId, SchemaId, TokenId};
use graphkernel_core::kernel_version::KernelVersion;
use graphkernel_core::mode::RecordLoadMode;
use graphkernel_schema::SchemaCache;
use graphkernel_storage::{CountsStore, StoreRegistry};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A node-label or relationship-type update observation, the payload
/// every update listener receives.
pub type UpdateListener = Box<dyn Fn(TokenId) + Send + Sync>;

/// Each registered listener is driven through its own single-writer
/// queue (spec §9 "one `WorkSync` per id generator, one for the index
/// listener, one for the node-label-scan listener, one for the
/// rel-type-scan listener") so that concurrently applying transactions
/// serialize their notifications rather than racing the callback.
#[derive(Default)]
struct Listeners {
    index_update: Option<WorkSync<UpdateListener>>,
    node_label_update: Option<WorkSync<UpdateListener>>,
    relationship_type_update: Option<WorkSync<UpdateListener>>,
}

/// A read-only, point-in-time handle onto the stores.
///
/// Cheap to create: it borrows the already-open stores rather than
/// opening new file handles. Isolation from in-flight writes comes
/// from the page cursor beneath each [`graphkernel_storage::RecordStore`]
/// reading whatever bytes are durable at the moment of the call, the
/// same guarantee the teacher's own cursor-based readers rely on.
pub struct StorageReader<'a> {
    registry: &'a StoreRegistry,
    schema_cache: &'a SchemaCache,
}

impl<'a> StorageReader<'a> {
    /// Read a node record, or `None` if not in use.
    pub fn node(&self, id: NodeId) -> Result<Option<NodeRecord>> {
        self.registry.nodes.read(id.id(), RecordLoadMode::Normal)
    }

    /// Read a relationship record, or `None` if not in use.
    pub fn relationship(&self, id: RelationshipId) -> Result<Option<RelationshipRecord>> {
        self.registry.relationships.read(id.id(), RecordLoadMode::Normal)
    }

    /// Read a relationship-group record, or `None` if not in use.
    pub fn relationship_group(&self, id: RelationshipGroupId) -> Result<Option<RelationshipGroupRecord>> {
        self.registry.relationship_groups.read(id.id(), RecordLoadMode::Normal)
    }

    /// Read a property chain entry's logical record.
    pub fn property(&self, id: PropertyId) -> Result<Option<PropertyRecord>> {
        Ok(self
            .registry
            .properties
            .read(id)?
            .map(|(key, value, next)| PropertyRecord { key, value, next }))
    }

    /// Read a schema rule's record, or `None` if not in use.
    pub fn schema_rule(&self, id: SchemaId) -> Result<Option<SchemaRecord>> {
        self.registry.schema.read(id.id(), RecordLoadMode::Normal)
    }

    /// Read a token's record, or `None` if not in use.
    pub fn token(&self, id: TokenId) -> Result<Option<TokenRecord>> {
        self.registry.tokens.read(id.id(), RecordLoadMode::Normal)
    }

    /// The durable kernel version as of this snapshot.
    pub fn kernel_version(&self) -> Result<KernelVersion> {
        self.registry.kernel_version()
    }

    /// The schema cache this reader sees, for index/constraint lookups
    /// alongside record reads.
    pub fn schema_cache(&self) -> &SchemaCache {
        self.schema_cache
    }
}

/// File-metadata entry for [`Engine::list_storage_files`] (spec §6
/// "counts and degrees are atomic, record stores are replayable").
#[derive(Debug, Clone)]
pub struct StorageFileInfo {
    /// The file's path on disk.
    pub path: PathBuf,
    /// True if this file's contents can be fully reconstructed by
    /// replaying the command log from empty.
    pub replayable: bool,
}

/// Identifying information about the store as a whole.
#[derive(Debug, Clone, Copy)]
pub struct MetadataProvider {
    /// The random id assigned when the store was created.
    pub store_id: u128,
    /// The durable kernel version.
    pub kernel_version: KernelVersion,
}

/// Builds an [`Engine`], the only place listeners can be registered.
pub struct EngineBuilder {
    base_dir: PathBuf,
    config: EngineConfig,
    runtime_version: KernelVersion,
    listeners: Listeners,
}

impl EngineBuilder {
    /// Start building an engine over `base_dir` with `config`, running
    /// at `runtime_version`.
    pub fn new(base_dir: impl AsRef<Path>, config: EngineConfig, runtime_version: KernelVersion) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            config,
            runtime_version,
            listeners: Listeners::default(),
        }
    }

    /// Register the one index-update listener this engine will ever
    /// have. Errors if called twice.
    pub fn with_index_update_listener(mut self, listener: UpdateListener) -> Result<Self> {
        if self.listeners.index_update.is_some() {
            return Err(Error::ConfigurationError("index update listener already registered".to_string()));
        }
        self.listeners.index_update = Some(WorkSync::new(listener));
        Ok(self)
    }

    /// Register the one node-label-update listener this engine will
    /// ever have. Errors if called twice.
    pub fn with_node_label_update_listener(mut self, listener: UpdateListener) -> Result<Self> {
        if self.listeners.node_label_update.is_some() {
            return Err(Error::ConfigurationError("node label update listener already registered".to_string()));
        }
        self.listeners.node_label_update = Some(WorkSync::new(listener));
        Ok(self)
    }

    /// Register the one relationship-type-update listener this engine
    /// will ever have. Errors if called twice.
    pub fn with_relationship_type_update_listener(mut self, listener: UpdateListener) -> Result<Self> {
        if self.listeners.relationship_type_update.is_some() {
            return Err(Error::ConfigurationError(
                "relationship type update listener already registered".to_string(),
            ));
        }
        self.listeners.relationship_type_update = Some(WorkSync::new(listener));
        Ok(self)
    }

    /// Open the stores and produce the immutable [`Engine`].
    pub fn build(self) -> Result<Engine> {
        let registry = StoreRegistry::open(&self.base_dir)?;
        let locks: Box<dyn LockService> = if self.config.read_only {
            Box::new(NoopLockService)
        } else {
            Box::new(RecordLockService::new())
        };
        Ok(Engine {
            registry,
            schema_cache: SchemaCache::new(),
            health: DatabaseHealth::new(),
            config: self.config,
            locks,
            upgrade_lock: UpgradeLock::new(),
            runtime_version: self.runtime_version,
            upgrade_issued: AtomicBool::new(false),
            listeners: self.listeners,
        })
    }
}

/// The transactional record storage engine (spec §2, §6).
pub struct Engine {
    registry: StoreRegistry,
    schema_cache: SchemaCache,
    health: DatabaseHealth,
    config: EngineConfig,
    locks: Box<dyn LockService>,
    upgrade_lock: UpgradeLock,
    runtime_version: KernelVersion,
    upgrade_issued: AtomicBool,
    listeners: Listeners,
}

/// How long a transaction waits to acquire a record lock before
/// surfacing [`Error::LockTimeout`] (spec §5 "Locks").
pub const DEFAULT_TRANSACTION_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

impl Engine {
    /// Start building an engine over `base_dir`.
    pub fn builder(base_dir: impl AsRef<Path>, config: EngineConfig, runtime_version: KernelVersion) -> EngineBuilder {
        EngineBuilder::new(base_dir, config, runtime_version)
    }

    /// A cheap, read-only snapshot handle.
    pub fn new_reader(&self) -> StorageReader<'_> {
        StorageReader {
            registry: &self.registry,
            schema_cache: &self.schema_cache,
        }
    }

    /// Fresh per-transaction scratch space for staging record deltas.
    pub fn new_command_creation_context(&self) -> CommandCreationContext<'_> {
        CommandCreationContext::new(&self.registry, &self.config)
    }

    /// Acquire the exclusive lock for a record this transaction is
    /// about to mutate. The kernel above is expected to call this once
    /// per record before staging a change into the creation context.
    pub fn acquire_lock(&self, record: graphkernel_core::ids::RecordId, tx: u64) -> Result<()> {
        self.locks.acquire_exclusive(record, tx, DEFAULT_TRANSACTION_LOCK_TIMEOUT)
    }

    /// Release every lock a committing or aborting transaction holds.
    pub fn release_locks(&self, tx: u64) {
        self.locks.release_all(tx);
    }

    /// Validate and extract the ordered command list from a staged
    /// creation context. Consumes the context.
    pub fn create_commands(&self, ctx: CommandCreationContext<'_>) -> Result<Vec<Command>> {
        let state = ctx.finish();
        let outcome = IntegrityValidator::validate(&state, &self.schema_cache);
        if !outcome.is_valid() {
            return Err(Error::Validation(format!("{:?}", outcome.failures)));
        }
        Ok(CommandExtractor::extract(&state))
    }

    /// If the store lags this build's runtime kernel version, attempt
    /// to obtain the single-element upgrade prefix (spec §4.7). Honors
    /// `allow_single_automatic_upgrade` and only ever issues one upgrade
    /// per engine lifetime.
    pub fn create_upgrade_commands(&self) -> Result<Option<MetaDataCmd>> {
        if !self.config.allow_single_automatic_upgrade || self.upgrade_issued.load(Ordering::Acquire) {
            return Ok(None);
        }
        let store_version = self.registry.kernel_version()?;
        let cmd = UpgradeCoordinator::maybe_upgrade(
            store_version,
            self.runtime_version,
            || self.registry.kernel_version().unwrap_or(store_version),
            &self.upgrade_lock,
        );
        if cmd.is_some() {
            self.upgrade_issued.store(true, Ordering::Release);
        }
        Ok(cmd)
    }

    /// Hold the shared upgrade lock for the duration of a write commit
    /// (spec §5 "a shared upgrade lock held by every write-commit").
    pub fn acquire_commit_upgrade_lock(&self) -> Option<graphkernel_concurrency::upgrade_lock::SharedUpgradeGuard<'_>> {
        Some(self.upgrade_lock.acquire_shared())
    }

    /// Apply a committed batch through the mode-gated applier chain. On
    /// error, the database is marked unhealthy and the error rethrown
    /// (spec §6 "apply").
    pub fn apply(&self, commands: &[Command], mode: ApplicationMode, tx: u64) -> Result<()> {
        if self.config.read_only {
            return Err(Error::ConfigurationError("engine is read-only".to_string()));
        }
        if !self.health.is_healthy() {
            return Err(Error::ApplyFailure(
                self.health.reason().unwrap_or_else(|| "database is unhealthy".to_string()),
            ));
        }
        let chain = ApplierChain::build(mode, &self.config);
        let ctx = ApplyContext {
            registry: &self.registry,
            schema_cache: &self.schema_cache,
            health: &self.health,
            mode,
            tx,
            index_update_listener: self.listeners.index_update.as_ref(),
            node_label_update_listener: self.listeners.node_label_update.as_ref(),
            relationship_type_update_listener: self.listeners.relationship_type_update.as_ref(),
        };
        chain.apply_batch(commands, &ctx)
    }

    /// Checkpoint: flush counts, then degrees, then every record store
    /// (spec §4.8).
    pub fn flush_and_force(&self) -> Result<()> {
        self.registry.flush_and_force()
    }

    /// Report every store file with its atomic/replayable classification
    /// (spec §6 "counts and degrees are atomic, record stores are
    /// replayable").
    pub fn list_storage_files(&self) -> Vec<StorageFileInfo> {
        let mut files: Vec<StorageFileInfo> = self
            .registry
            .list_storage_files()
            .into_iter()
            .map(|path| StorageFileInfo { path, replayable: true })
            .collect();
        files.push(StorageFileInfo {
            path: self.registry.base_dir().join("neostore.counts.dump"),
            replayable: false,
        });
        files
    }

    /// Identifying information for this store.
    pub fn get_store_id(&self) -> Result<u128> {
        Ok(self.registry.read_meta_data()?.map(|m| m.store_id).unwrap_or(0))
    }

    /// Kernel version and store id together, for callers that want both
    /// without two round trips to the meta-data store.
    pub fn metadata_provider(&self) -> Result<MetadataProvider> {
        let meta = self.registry.read_meta_data()?;
        Ok(MetadataProvider {
            store_id: meta.as_ref().map(|m| m.store_id).unwrap_or(0),
            kernel_version: meta.map(|m| m.kernel_version).unwrap_or_default(),
        })
    }

    /// Direct accessor for the label/relationship-type counts store.
    pub fn counts_accessor(&self) -> &CountsStore {
        &self.registry.counts
    }

    /// Direct accessor for the schema/token cache and backing stores.
    pub fn schema_and_tokens_lifecycle(&self) -> &SchemaCache {
        &self.schema_cache
    }

    /// The configuration this engine was opened with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether the database is still considered structurally sound.
    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    /// Advance every id generator's reuse barrier past ids freed by
    /// transactions older than `oldest_active_tx`.
    pub fn advance_reuse_barriers(&self, oldest_active_tx: u64) {
        self.registry.advance_reuse_barriers(oldest_active_tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_engine(dir: &Path) -> Engine {
        Engine::builder(dir, EngineConfig::default(), KernelVersion::V1)
            .build()
            .unwrap()
    }

    #[test]
    fn reader_sees_nothing_in_a_fresh_engine() {
        let dir = tempdir().unwrap();
        let engine = open_engine(dir.path());
        let reader = engine.new_reader();
        assert_eq!(reader.node(NodeId::new(1)).unwrap(), None);
    }

    #[test]
    fn double_listener_registration_is_rejected() {
        let dir = tempdir().unwrap();
        let builder = EngineBuilder::new(dir.path(), EngineConfig::default(), KernelVersion::V1)
            .with_index_update_listener(Box::new(|_| {}))
            .unwrap();
        let result = builder.with_index_update_listener(Box::new(|_| {}));
        assert!(result.is_err());
    }

    #[test]
    fn read_only_engine_rejects_apply() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::builder().read_only(true).build();
        let engine = Engine::builder(dir.path(), config, KernelVersion::V1).build().unwrap();
        let result = engine.apply(&[], ApplicationMode::Internal, 1);
        assert!(result.is_err());
    }

    #[test]
    fn create_commands_rejects_a_node_deletion_with_relationships() {
        let dir = tempdir().unwrap();
        let engine = open_engine(dir.path());
        let mut ctx = engine.new_command_creation_context();
        use crate::tx_state::TxStateVisitor;
        ctx.visit_created_node(NodeId::new(1), &[]).unwrap();
        ctx.visit_created_relationship(RelationshipId::new(1), TokenId::new(1), NodeId::new(1), NodeId::new(2))
            .unwrap();
        let commands = engine.create_commands(ctx).unwrap();
        engine.apply(&commands, ApplicationMode::Internal, 1).unwrap();

        let mut delete_ctx = engine.new_command_creation_context();
        delete_ctx.visit_deleted_node(NodeId::new(1)).unwrap();
        let result = engine.create_commands(delete_ctx);
        assert!(result.is_err());
    }

    #[test]
    fn flush_and_force_succeeds_on_an_empty_engine() {
        let dir = tempdir().unwrap();
        let engine = open_engine(dir.path());
        engine.flush_and_force().unwrap();
    }

    #[test]
    fn list_storage_files_marks_the_counts_dump_non_replayable() {
        let dir = tempdir().unwrap();
        let engine = open_engine(dir.path());
        let files = engine.list_storage_files();
        let counts_entry = files.iter().find(|f| f.path.ends_with("neostore.counts.dump")).unwrap();
        assert!(!counts_entry.replayable);
    }
}
