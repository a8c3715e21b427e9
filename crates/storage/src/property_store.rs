//! Property value bridging (C1 + C3)
//!
//! [`graphkernel_core::value::PropertyValue`] is the logical value seen
//! by command extraction; [`crate::format::property::DiskPropertyRecord`]
//! is what actually fits in a fixed-size slot. `PropertyStore` is the
//! seam between the two: it decides inline vs. dynamic placement,
//! writes/reads the overflow chain, and is the only place in the crate
//! that needs to know about both representations at once.

use crate::format::dynamic::{chunk, ArrayChainBlock, DynamicBlock, StringChainBlock};
use crate::format::property::{DiskPropertyRecord, ValueTag, INLINE_DATA_LEN};
use crate::id_generator::IdGenerator;
use crate::record_store::RecordStore;
use byteorder::{ByteOrder, LittleEndian};
use graphkernel_core::error::{Error, Result};
use graphkernel_core::ids::{PropertyId, RecordKind, TokenId};
use graphkernel_core::mode::RecordLoadMode;
use graphkernel_core::value::PropertyValue;

/// Owns the property record store plus both dynamic overflow chains,
/// and translates between [`PropertyValue`] and their on-disk shapes.
pub struct PropertyStore {
    records: RecordStore<DiskPropertyRecord>,
    strings: RecordStore<StringChainBlock>,
    arrays: RecordStore<ArrayChainBlock>,
    property_ids: IdGenerator,
    string_ids: IdGenerator,
    array_ids: IdGenerator,
}

impl PropertyStore {
    /// Open the property record store and both dynamic chain stores
    /// under `base_dir`.
    pub fn open(base_dir: impl AsRef<std::path::Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let records = RecordStore::open(base_dir.join("properties"))?;
        let strings = RecordStore::open(base_dir.join("properties.strings"))?;
        let arrays = RecordStore::open(base_dir.join("properties.arrays"))?;
        let property_high = records.high_id();
        let string_high = strings.high_id();
        let array_high = arrays.high_id();
        Ok(Self {
            property_ids: IdGenerator::new(
                RecordKind::Property,
                property_high,
                base_dir.join("properties.id"),
            ),
            records,
            strings,
            arrays,
            string_ids: IdGenerator::new(
                RecordKind::DynamicString,
                string_high,
                base_dir.join("properties.strings.id"),
            ),
            array_ids: IdGenerator::new(
                RecordKind::DynamicArray,
                array_high,
                base_dir.join("properties.arrays.id"),
            ),
        })
    }

    /// Read the logical value stored at `id`, resolving any dynamic
    /// chain. Returns `None` if the slot is not in use.
    pub fn read(&self, id: PropertyId) -> Result<Option<(TokenId, PropertyValue, Option<PropertyId>)>> {
        let Some(disk) = self.records.read(id.id(), RecordLoadMode::Normal)? else {
            return Ok(None);
        };
        let value = self.resolve(&disk)?;
        Ok(Some((disk.key, value, disk.next)))
    }

    fn resolve(&self, disk: &DiskPropertyRecord) -> Result<PropertyValue> {
        match disk.tag {
            ValueTag::Bool => Ok(PropertyValue::Bool(LittleEndian::read_i64(&disk.data[0..8]) != 0)),
            ValueTag::Int => Ok(PropertyValue::Int(LittleEndian::read_i64(&disk.data[0..8]))),
            ValueTag::Float => Ok(PropertyValue::Float(f64::from_bits(LittleEndian::read_u64(
                &disk.data[0..8],
            )))),
            ValueTag::InlineString => {
                let len = disk.data.iter().position(|b| *b == 0).unwrap_or(INLINE_DATA_LEN);
                let s = String::from_utf8(disk.data[..len].to_vec())
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(PropertyValue::String(s))
            }
            ValueTag::DynamicString => {
                let (first_block, total_len) = disk.dynamic_pointer();
                let bytes = self.read_chain(&self.strings, first_block, total_len)?;
                let s = String::from_utf8(bytes).map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(PropertyValue::String(s))
            }
            ValueTag::DynamicIntArray => {
                let (first_block, total_len) = disk.dynamic_pointer();
                let bytes = self.read_chain(&self.arrays, first_block, total_len)?;
                let values: Vec<i64> =
                    bincode::deserialize(&bytes).map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(PropertyValue::IntArray(values))
            }
            ValueTag::DynamicStringArray => {
                let (first_block, total_len) = disk.dynamic_pointer();
                let bytes = self.read_chain(&self.arrays, first_block, total_len)?;
                let values: Vec<String> =
                    bincode::deserialize(&bytes).map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(PropertyValue::StringArray(values))
            }
        }
    }

    fn read_chain<F>(&self, store: &RecordStore<F>, first_block: u64, total_len: u64) -> Result<Vec<u8>>
    where
        F: crate::format::RecordFormat + AsRef<DynamicBlock>,
    {
        let mut out = Vec::with_capacity(total_len as usize);
        let mut next = Some(first_block);
        while let Some(id) = next {
            let block = store.read_required(id)?;
            let block = block.as_ref();
            out.extend_from_slice(block.bytes());
            next = block.next;
        }
        out.truncate(total_len as usize);
        Ok(out)
    }

    /// Write `value` under `key` at `id`, chaining through the dynamic
    /// store when it does not fit inline. `next` is the owning entity's
    /// next-property pointer, carried through unchanged.
    pub fn write(
        &self,
        id: PropertyId,
        key: TokenId,
        value: &PropertyValue,
        next: Option<PropertyId>,
    ) -> Result<()> {
        let disk = match value {
            PropertyValue::Bool(b) => {
                let mut data = [0u8; INLINE_DATA_LEN];
                LittleEndian::write_i64(&mut data[0..8], if *b { 1 } else { 0 });
                DiskPropertyRecord {
                    key,
                    next,
                    tag: ValueTag::Bool,
                    data,
                }
            }
            PropertyValue::Int(v) => {
                let mut data = [0u8; INLINE_DATA_LEN];
                LittleEndian::write_i64(&mut data[0..8], *v);
                DiskPropertyRecord {
                    key,
                    next,
                    tag: ValueTag::Int,
                    data,
                }
            }
            PropertyValue::Float(v) => {
                let mut data = [0u8; INLINE_DATA_LEN];
                LittleEndian::write_u64(&mut data[0..8], v.to_bits());
                DiskPropertyRecord {
                    key,
                    next,
                    tag: ValueTag::Float,
                    data,
                }
            }
            PropertyValue::String(s) if value.fits_inline(INLINE_DATA_LEN) => {
                let mut data = [0u8; INLINE_DATA_LEN];
                data[..s.len()].copy_from_slice(s.as_bytes());
                DiskPropertyRecord {
                    key,
                    next,
                    tag: ValueTag::InlineString,
                    data,
                }
            }
            PropertyValue::String(s) => {
                let first_block = self.write_chain(&self.strings, &self.string_ids, s.as_bytes())?;
                DiskPropertyRecord::with_dynamic_pointer(
                    key,
                    next,
                    ValueTag::DynamicString,
                    first_block,
                    s.len() as u64,
                )
            }
            PropertyValue::IntArray(values) => {
                let bytes = bincode::serialize(values).map_err(|e| Error::Serialization(e.to_string()))?;
                let first_block = self.write_chain(&self.arrays, &self.array_ids, &bytes)?;
                DiskPropertyRecord::with_dynamic_pointer(
                    key,
                    next,
                    ValueTag::DynamicIntArray,
                    first_block,
                    bytes.len() as u64,
                )
            }
            PropertyValue::StringArray(values) => {
                let bytes = bincode::serialize(values).map_err(|e| Error::Serialization(e.to_string()))?;
                let first_block = self.write_chain(&self.arrays, &self.array_ids, &bytes)?;
                DiskPropertyRecord::with_dynamic_pointer(
                    key,
                    next,
                    ValueTag::DynamicStringArray,
                    first_block,
                    bytes.len() as u64,
                )
            }
        };
        self.records.write(id.id(), Some(&disk))
    }

    fn write_chain<F>(&self, store: &RecordStore<F>, ids: &IdGenerator, bytes: &[u8]) -> Result<u64>
    where
        F: crate::format::RecordFormat + From<DynamicBlock>,
    {
        let chunks = chunk(bytes);
        let block_ids: Vec<u64> = (0..chunks.len())
            .map(|_| ids.allocate())
            .collect::<Result<_>>()?;
        for (i, piece) in chunks.iter().enumerate() {
            let next_id = block_ids.get(i + 1).copied();
            let block = DynamicBlock::new(piece, next_id);
            store.write(block_ids[i], Some(&F::from(block)))?;
        }
        Ok(block_ids[0])
    }

    /// Free the slot at `id`, including every block of its dynamic
    /// chain if it has one. `freed_by_tx` gates when the id becomes
    /// reusable (spec §4.2 reuse barrier).
    pub fn delete(&self, id: PropertyId, freed_by_tx: u64) -> Result<()> {
        if let Some(disk) = self.records.read(id.id(), RecordLoadMode::Normal)? {
            match disk.tag {
                ValueTag::DynamicString => {
                    let (first_block, _) = disk.dynamic_pointer();
                    self.free_chain(&self.strings, &self.string_ids, first_block)?;
                }
                ValueTag::DynamicIntArray | ValueTag::DynamicStringArray => {
                    let (first_block, _) = disk.dynamic_pointer();
                    self.free_chain(&self.arrays, &self.array_ids, first_block)?;
                }
                _ => {}
            }
        }
        self.records.write(id.id(), None)?;
        self.property_ids.free(id.id(), freed_by_tx);
        Ok(())
    }

    fn free_chain<F>(&self, store: &RecordStore<F>, ids: &IdGenerator, first_block: u64) -> Result<()>
    where
        F: crate::format::RecordFormat + AsRef<DynamicBlock>,
    {
        let mut next = Some(first_block);
        while let Some(id) = next {
            let block = store.read_required(id)?;
            next = block.as_ref().next;
            store.write(id, None)?;
            ids.free(id, 0);
        }
        Ok(())
    }

    /// Allocate a property record id, preferring a reused one.
    pub fn new_id(&self) -> Result<u64> {
        self.property_ids.allocate()
    }

    /// Advance the reuse barrier for freed property ids.
    pub fn advance_reuse_barrier(&self, oldest_active_tx: u64) -> usize {
        self.property_ids.advance_reuse_barrier(oldest_active_tx)
    }

    /// The longest string that fits in a property record without
    /// chaining through the dynamic store.
    pub fn inline_capacity(&self) -> usize {
        INLINE_DATA_LEN
    }
}

impl AsRef<DynamicBlock> for StringChainBlock {
    fn as_ref(&self) -> &DynamicBlock {
        &self.0
    }
}

impl AsRef<DynamicBlock> for ArrayChainBlock {
    fn as_ref(&self) -> &DynamicBlock {
        &self.0
    }
}

impl From<DynamicBlock> for StringChainBlock {
    fn from(block: DynamicBlock) -> Self {
        StringChainBlock(block)
    }
}

impl From<DynamicBlock> for ArrayChainBlock {
    fn from(block: DynamicBlock) -> Self {
        ArrayChainBlock(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, PropertyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PropertyStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn scalar_round_trips() {
        let (_dir, store) = open_store();
        let id = PropertyId::new(store.new_id().unwrap());
        store.write(id, TokenId::new(1), &PropertyValue::Int(42), None).unwrap();
        let (key, value, next) = store.read(id).unwrap().unwrap();
        assert_eq!(key, TokenId::new(1));
        assert_eq!(value, PropertyValue::Int(42));
        assert_eq!(next, None);
    }

    #[test]
    fn short_string_round_trips_inline() {
        let (_dir, store) = open_store();
        let id = PropertyId::new(store.new_id().unwrap());
        let value = PropertyValue::String("hi".into());
        store.write(id, TokenId::new(1), &value, None).unwrap();
        let (_, read_back, _) = store.read(id).unwrap().unwrap();
        assert_eq!(read_back, value);
    }

    #[test]
    fn long_string_round_trips_through_dynamic_chain() {
        let (_dir, store) = open_store();
        let id = PropertyId::new(store.new_id().unwrap());
        let long = "abcde".repeat(100);
        let value = PropertyValue::String(long.clone());
        store.write(id, TokenId::new(1), &value, None).unwrap();
        let (_, read_back, _) = store.read(id).unwrap().unwrap();
        assert_eq!(read_back, PropertyValue::String(long));
    }

    #[test]
    fn int_array_round_trips_through_dynamic_chain() {
        let (_dir, store) = open_store();
        let id = PropertyId::new(store.new_id().unwrap());
        let value = PropertyValue::IntArray((0..50).collect());
        store.write(id, TokenId::new(1), &value, None).unwrap();
        let (_, read_back, _) = store.read(id).unwrap().unwrap();
        assert_eq!(read_back, value);
    }

    #[test]
    fn delete_frees_dynamic_chain_blocks() {
        let (_dir, store) = open_store();
        let id = PropertyId::new(store.new_id().unwrap());
        let long = "z".repeat(500);
        store
            .write(id, TokenId::new(1), &PropertyValue::String(long), None)
            .unwrap();
        store.delete(id, 0).unwrap();
        assert_eq!(store.read(id).unwrap(), None);
        assert!(store.string_ids.reusable_count() > 0);
    }
}
