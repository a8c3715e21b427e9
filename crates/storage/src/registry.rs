//! Store registry
//!
//! Aggregates every record store, id generator, and accumulator into
//! one handle the engine crate opens once per database. Mirrors the
//! teacher's habit of bundling its stores behind a single "neo store"
//! entry point rather than having callers open files individually.

use crate::counts::CountsStore;
use crate::degrees::DegreesStore;
use crate::format::meta_data::MetaDataRecord;
use crate::id_generator::IdGenerator;
use crate::property_store::PropertyStore;
use crate::record_store::RecordStore;
use graphkernel_core::command::{
    NodeRecord, RelationshipGroupRecord, RelationshipRecord, SchemaRecord, TokenRecord,
};
use graphkernel_core::error::Result;
use graphkernel_core::ids::RecordKind;
use graphkernel_core::kernel_version::KernelVersion;
use graphkernel_core::mode::RecordLoadMode;
use std::path::{Path, PathBuf};

/// The single record reserved for meta-data.
const META_DATA_RECORD_ID: u64 = 0;

/// Every store and id generator the engine needs, opened as a unit.
pub struct StoreRegistry {
    /// Node record store.
    pub nodes: RecordStore<NodeRecord>,
    /// Relationship record store.
    pub relationships: RecordStore<RelationshipRecord>,
    /// Relationship-group record store.
    pub relationship_groups: RecordStore<RelationshipGroupRecord>,
    /// Schema-rule record store.
    pub schema: RecordStore<SchemaRecord>,
    /// Token record store.
    pub tokens: RecordStore<TokenRecord>,
    /// Meta-data record store (single record).
    pub meta_data: RecordStore<MetaDataRecord>,
    /// Property record store plus dynamic chains.
    pub properties: PropertyStore,
    /// Accumulated label/type counts.
    pub counts: CountsStore,
    /// Accumulated relationship-group degrees.
    pub degrees: DegreesStore,

    /// Node id allocator.
    pub node_ids: IdGenerator,
    /// Relationship id allocator.
    pub relationship_ids: IdGenerator,
    /// Relationship-group id allocator.
    pub relationship_group_ids: IdGenerator,
    /// Schema-rule id allocator.
    pub schema_ids: IdGenerator,
    /// Token id allocator.
    pub token_ids: IdGenerator,

    base_dir: PathBuf,
    counts_path: PathBuf,
}

impl StoreRegistry {
    /// Open (creating if necessary) every store under `base_dir`.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;

        let nodes: RecordStore<NodeRecord> = RecordStore::open(base_dir.join("neostore.nodestore"))?;
        let relationships: RecordStore<RelationshipRecord> =
            RecordStore::open(base_dir.join("neostore.relationshipstore"))?;
        let relationship_groups: RecordStore<RelationshipGroupRecord> =
            RecordStore::open(base_dir.join("neostore.relationshipgroupstore"))?;
        let schema: RecordStore<SchemaRecord> = RecordStore::open(base_dir.join("neostore.schemastore"))?;
        let tokens: RecordStore<TokenRecord> = RecordStore::open(base_dir.join("neostore.tokenstore"))?;
        let meta_data: RecordStore<MetaDataRecord> =
            RecordStore::open(base_dir.join("neostore.metadatastore"))?;
        let properties = PropertyStore::open(&base_dir)?;

        let counts_path = base_dir.join("neostore.counts.dump");
        let counts = CountsStore::load(&counts_path)?;
        let degrees = DegreesStore::new();

        let node_ids = IdGenerator::new(RecordKind::Node, nodes.high_id(), base_dir.join("nodestore.id"));
        let relationship_ids = IdGenerator::new(
            RecordKind::Relationship,
            relationships.high_id(),
            base_dir.join("relationshipstore.id"),
        );
        let relationship_group_ids = IdGenerator::new(
            RecordKind::RelationshipGroup,
            relationship_groups.high_id(),
            base_dir.join("relationshipgroupstore.id"),
        );
        let schema_ids = IdGenerator::new(RecordKind::Schema, schema.high_id(), base_dir.join("schemastore.id"));
        let token_ids = IdGenerator::new(RecordKind::Token, tokens.high_id(), base_dir.join("tokenstore.id"));

        Ok(Self {
            nodes,
            relationships,
            relationship_groups,
            schema,
            tokens,
            meta_data,
            properties,
            counts,
            degrees,
            node_ids,
            relationship_ids,
            relationship_group_ids,
            schema_ids,
            token_ids,
            base_dir,
            counts_path,
        })
    }

    /// The base directory every store file lives under.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The single meta-data record, or `None` if the store has never
    /// been initialised.
    pub fn read_meta_data(&self) -> Result<Option<MetaDataRecord>> {
        self.meta_data.read(META_DATA_RECORD_ID, RecordLoadMode::Always)
    }

    /// Overwrite the meta-data record.
    pub fn write_meta_data(&self, record: &MetaDataRecord) -> Result<()> {
        self.meta_data.write(META_DATA_RECORD_ID, Some(record))
    }

    /// The durable kernel version, defaulting to [`KernelVersion::default`]
    /// for a store that has never recorded meta-data.
    pub fn kernel_version(&self) -> Result<KernelVersion> {
        Ok(self
            .read_meta_data()?
            .map(|m| m.kernel_version)
            .unwrap_or_default())
    }

    /// Every store file path, for backup/replay enumeration (spec §4.1).
    pub fn list_storage_files(&self) -> Vec<PathBuf> {
        vec![
            self.nodes.path().to_path_buf(),
            self.relationships.path().to_path_buf(),
            self.relationship_groups.path().to_path_buf(),
            self.schema.path().to_path_buf(),
            self.tokens.path().to_path_buf(),
            self.meta_data.path().to_path_buf(),
            self.base_dir.join("properties"),
            self.base_dir.join("properties.strings"),
            self.base_dir.join("properties.arrays"),
        ]
    }

    /// Flush every store and persist id-generator / counts checkpoints
    /// (spec §4.8: "counts → degrees → record stores").
    pub fn flush_and_force(&self) -> Result<()> {
        self.counts.flush(&self.counts_path)?;
        self.node_ids.checkpoint()?;
        self.relationship_ids.checkpoint()?;
        self.relationship_group_ids.checkpoint()?;
        self.schema_ids.checkpoint()?;
        self.token_ids.checkpoint()?;
        self.nodes.flush()?;
        self.relationships.flush()?;
        self.relationship_groups.flush()?;
        self.schema.flush()?;
        self.tokens.flush()?;
        self.meta_data.flush()?;
        Ok(())
    }

    /// Advance every id generator's reuse barrier, including the
    /// property store's internal generator.
    pub fn advance_reuse_barriers(&self, oldest_active_tx: u64) {
        self.node_ids.advance_reuse_barrier(oldest_active_tx);
        self.relationship_ids.advance_reuse_barrier(oldest_active_tx);
        self.relationship_group_ids
            .advance_reuse_barrier(oldest_active_tx);
        self.schema_ids.advance_reuse_barrier(oldest_active_tx);
        self.token_ids.advance_reuse_barrier(oldest_active_tx);
        self.properties.advance_reuse_barrier(oldest_active_tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_empty_registry_with_default_kernel_version() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        assert_eq!(registry.kernel_version().unwrap(), KernelVersion::default());
    }

    #[test]
    fn lists_every_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        assert_eq!(registry.list_storage_files().len(), 9);
    }

    #[test]
    fn writes_and_reads_meta_data() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        let record = MetaDataRecord {
            kernel_version: KernelVersion::V1,
            store_id: 42,
            creation_time: 0,
        };
        registry.write_meta_data(&record).unwrap();
        assert_eq!(registry.read_meta_data().unwrap(), Some(record));
        assert_eq!(registry.kernel_version().unwrap(), KernelVersion::V1);
    }

    #[test]
    fn flush_and_force_does_not_error_on_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::open(dir.path()).unwrap();
        registry.flush_and_force().unwrap();
    }
}
