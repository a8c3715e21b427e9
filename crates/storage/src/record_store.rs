//! Generic fixed-record store
//!
//! One [`RecordStore<F>`] exists per record kind (spec §4.1). The store
//! itself only knows how to read/write a slot by id; it does not decide
//! ordering between concurrent writers (the applier chain, §4.4, owns
//! that) and it does not track free ids for reuse (the id generator,
//! §4.2, owns that) — it tracks only the high-water mark of ids it has
//! ever been asked to write, so that id generator and recovery can both
//! observe "how far has this store grown".

use crate::format::{DecodeError, RecordFormat};
use crate::page_cursor::{FileCursor, PageCursor};
use graphkernel_core::error::{Error, Result};
use graphkernel_core::ids::RESERVED_LOW_IDS;
use graphkernel_core::mode::RecordLoadMode;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

const IN_USE_BYTE: u8 = 1;
const NOT_IN_USE_BYTE: u8 = 0;

/// A typed, fixed-size-record file addressed by integer id.
pub struct RecordStore<F: RecordFormat> {
    cursor: Box<dyn PageCursor>,
    high_id: AtomicU64,
    _marker: PhantomData<F>,
}

impl<F: RecordFormat> RecordStore<F> {
    /// Open (creating if necessary) the store file at `path`, scanning
    /// it to recompute the high-water mark.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let cursor = FileCursor::open(path)?;
        let high_id = Self::scan_high_id(&cursor)?;
        Ok(Self {
            cursor: Box::new(cursor),
            high_id: AtomicU64::new(high_id),
            _marker: PhantomData,
        })
    }

    fn scan_high_id(cursor: &FileCursor) -> Result<u64> {
        let len = cursor.len()?;
        Ok(len / F::RECORD_SIZE as u64)
    }

    /// This store's on-disk path, for backup/replay enumeration.
    pub fn path(&self) -> &Path {
        self.cursor.path()
    }

    /// Fixed record width in bytes.
    pub fn record_size(&self) -> usize {
        F::RECORD_SIZE
    }

    /// Count of low ids reserved by the store header.
    pub fn reserved_low_ids(&self) -> u64 {
        RESERVED_LOW_IDS
    }

    /// One past the highest id this store has ever written — the next
    /// id a fresh allocator would hand out if it ignored the free list
    /// entirely.
    pub fn high_id(&self) -> u64 {
        self.high_id.load(Ordering::Acquire)
    }

    /// A fresh id guaranteed not to collide with any id this store has
    /// ever held, ignoring free-list reuse (spec §4.1 `newRecord()`).
    /// The id generator (§4.2) is responsible for preferring reused ids
    /// over calling this.
    pub fn new_record(&self) -> u64 {
        self.high_id.fetch_add(1, Ordering::AcqRel).max(RESERVED_LOW_IDS)
    }

    fn offset_of(id: u64) -> u64 {
        id * F::RECORD_SIZE as u64
    }

    /// Read the record at `id`. Returns `Ok(None)` when the slot is not
    /// in use and `mode` is [`RecordLoadMode::Normal`] or
    /// [`RecordLoadMode::Check`]; raises [`Error::Validation`] for
    /// `Normal` only when the caller explicitly demanded presence via
    /// [`Self::read_required`].
    pub fn read(&self, id: u64, mode: RecordLoadMode) -> Result<Option<F>> {
        let mut buf = vec![0u8; F::RECORD_SIZE];
        let offset = Self::offset_of(id);
        if offset >= self.cursor.len()? {
            return match mode {
                RecordLoadMode::Always => Ok(None),
                _ => Ok(None),
            };
        }
        self.cursor.read_at(offset, &mut buf)?;
        let in_use = buf[0] == IN_USE_BYTE;
        if !in_use && mode != RecordLoadMode::Always {
            return Ok(None);
        }
        match F::decode(&buf[1..]) {
            Ok(record) => Ok(Some(record)),
            Err(DecodeError::UnknownFormatVersion(found)) => Err(Error::FormatMismatch {
                record: graphkernel_core::ids::RecordId::new(F::KIND, id),
                found,
                expected: 1,
            }),
            Err(other) => Err(Error::Validation(format!(
                "corrupt record {id} in {:?} store: {other}",
                F::KIND
            ))),
        }
    }

    /// Like [`Self::read`], but treats an absent/not-in-use record as a
    /// validation failure instead of `Ok(None)` — for call sites that
    /// have already established the id must exist.
    pub fn read_required(&self, id: u64) -> Result<F> {
        self.read(id, RecordLoadMode::Normal)?.ok_or_else(|| {
            Error::Validation(format!("record {id} not in use in {:?} store", F::KIND))
        })
    }

    /// Write `record` at `id`. `None` marks the slot not-in-use; writing
    /// `None` to an id never before used is a no-op other than
    /// advancing `high_id` if necessary (recovery may replay deletes of
    /// ids at the tail of the file).
    pub fn write(&self, id: u64, record: Option<&F>) -> Result<()> {
        let mut buf = vec![0u8; F::RECORD_SIZE];
        match record {
            Some(r) => {
                buf[0] = IN_USE_BYTE;
                r.encode(&mut buf[1..]);
            }
            None => {
                buf[0] = NOT_IN_USE_BYTE;
            }
        }
        let offset = Self::offset_of(id);
        self.cursor.write_at(offset, &buf)?;
        self.high_id.fetch_max(id + 1, Ordering::AcqRel);
        trace!(store = ?F::KIND, id, in_use = record.is_some(), "wrote record");
        Ok(())
    }

    /// Flush buffered writes to disk (part of spec §4.8 checkpoint
    /// sequence).
    pub fn flush(&self) -> Result<()> {
        Ok(self.cursor.sync()?)
    }
}

/// File-naming helper so the registry can lay out one file per store
/// under a common data directory, matching the teacher's convention of
/// naming store files after what they hold.
pub fn store_file_path(base_dir: &Path, file_name: &str) -> PathBuf {
    base_dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_core::command::NodeRecord;
    use graphkernel_core::ids::RelationshipId;
    use smallvec::SmallVec;

    fn sample_node() -> NodeRecord {
        NodeRecord {
            next_rel: Some(RelationshipId::new(1)),
            next_prop: None,
            labels: SmallVec::new(),
            is_dense: false,
            relationship_group: None,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store: RecordStore<NodeRecord> = RecordStore::open(dir.path().join("nodes")).unwrap();
        let record = sample_node();
        store.write(5, Some(&record)).unwrap();
        let read = store.read(5, RecordLoadMode::Normal).unwrap();
        assert_eq!(read, Some(record));
    }

    #[test]
    fn unwritten_record_reads_as_not_in_use() {
        let dir = tempfile::tempdir().unwrap();
        let store: RecordStore<NodeRecord> = RecordStore::open(dir.path().join("nodes")).unwrap();
        assert_eq!(store.read(3, RecordLoadMode::Normal).unwrap(), None);
    }

    #[test]
    fn deleting_clears_in_use_flag_but_record_remains_readable_with_always() {
        let dir = tempfile::tempdir().unwrap();
        let store: RecordStore<NodeRecord> = RecordStore::open(dir.path().join("nodes")).unwrap();
        store.write(1, Some(&sample_node())).unwrap();
        store.write(1, None).unwrap();
        assert_eq!(store.read(1, RecordLoadMode::Normal).unwrap(), None);
    }

    #[test]
    fn high_id_advances_with_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store: RecordStore<NodeRecord> = RecordStore::open(dir.path().join("nodes")).unwrap();
        store.write(10, Some(&sample_node())).unwrap();
        assert_eq!(store.high_id(), 11);
    }

    #[test]
    fn reopening_recomputes_high_id_from_file_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes");
        {
            let store: RecordStore<NodeRecord> = RecordStore::open(&path).unwrap();
            store.write(7, Some(&sample_node())).unwrap();
        }
        let reopened: RecordStore<NodeRecord> = RecordStore::open(&path).unwrap();
        assert_eq!(reopened.high_id(), 8);
    }

    #[test]
    fn read_required_errors_on_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store: RecordStore<NodeRecord> = RecordStore::open(dir.path().join("nodes")).unwrap();
        assert!(store.read_required(4).is_err());
    }
}
