//! Id allocation with reuse-barrier-gated free lists
//!
//! One [`IdGenerator`] exists per record kind (spec §4.2). It never
//! blocks on `allocate`; freed ids are staged behind a reuse barrier so
//! that no reader still observing the freeing transaction's snapshot
//! can be handed back an id it might still dereference (spec Invariant
//! 8: "free-id reuse never issues an id that is still referenced by any
//! in-use record").

use graphkernel_concurrency::WorkSync;
use graphkernel_core::error::{Error, Result};
use graphkernel_core::ids::RecordKind;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// An id freed by some transaction, pending promotion to the reusable
/// free list once no older reader can still observe it.
#[derive(Debug, Clone, Copy)]
struct PendingFree {
    id: u64,
    freed_by_tx: u64,
}

/// Per-record-kind id allocator.
pub struct IdGenerator {
    kind: RecordKind,
    high_id: AtomicU64,
    inner: WorkSync<Inner>,
    checkpoint_path: PathBuf,
}

struct Inner {
    /// Ids safe to hand out immediately.
    free_list: VecDeque<u64>,
    /// Ids freed but not yet past the reuse barrier.
    pending: VecDeque<PendingFree>,
}

impl IdGenerator {
    /// Create a generator starting from `initial_high_id` (typically a
    /// store's `high_id()` at open time), persisting its checkpoint
    /// sidecar at `checkpoint_path`.
    pub fn new(kind: RecordKind, initial_high_id: u64, checkpoint_path: impl AsRef<Path>) -> Self {
        Self {
            kind,
            high_id: AtomicU64::new(initial_high_id),
            inner: WorkSync::new(Inner {
                free_list: VecDeque::new(),
                pending: VecDeque::new(),
            }),
            checkpoint_path: checkpoint_path.as_ref().to_path_buf(),
        }
    }

    /// The record kind this generator allocates ids for.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Allocate a fresh id. Never blocks. Prefers a reused id from the
    /// free list over growing the high-water mark.
    pub fn allocate(&self) -> Result<u64> {
        let reused = self.inner.with_sink(|inner| inner.free_list.pop_front());
        if let Some(id) = reused {
            return Ok(id);
        }
        let id = self.high_id.fetch_add(1, Ordering::AcqRel);
        if id == u64::MAX {
            return Err(Error::OutOfIds(self.kind));
        }
        Ok(id)
    }

    /// Enqueue `id` for later reuse, tagged with the transaction that
    /// freed it. Goes through the single-writer queue so that ids freed
    /// by concurrently committing transactions are drained by whichever
    /// one first finds the queue idle, rather than each paying for its
    /// own lock acquisition.
    pub fn free(&self, id: u64, freed_by_tx: u64) {
        self.inner
            .apply_async(move |inner| inner.pending.push_back(PendingFree { id, freed_by_tx }));
    }

    /// Record an externally-chosen id as used, advancing the high-water
    /// mark if necessary. Used during recovery replay, where ids are
    /// dictated by the log rather than allocated fresh.
    pub fn mark(&self, id: u64) {
        self.high_id.fetch_max(id + 1, Ordering::AcqRel);
    }

    /// Promote every pending-free id whose freeing transaction is older
    /// than `oldest_active_tx` into the reusable free list (spec §4.2
    /// "reuse barrier").
    pub fn advance_reuse_barrier(&self, oldest_active_tx: u64) -> usize {
        self.inner.with_sink(|inner| {
            let mut promoted = 0;
            let mut still_pending = VecDeque::with_capacity(inner.pending.len());
            while let Some(p) = inner.pending.pop_front() {
                if p.freed_by_tx < oldest_active_tx {
                    inner.free_list.push_back(p.id);
                    promoted += 1;
                } else {
                    still_pending.push_back(p);
                }
            }
            inner.pending = still_pending;
            promoted
        })
    }

    /// Current high-water mark.
    pub fn high_id(&self) -> u64 {
        self.high_id.load(Ordering::Acquire)
    }

    /// Number of ids immediately available for reuse.
    pub fn reusable_count(&self) -> usize {
        self.inner.with_sink(|inner| inner.free_list.len())
    }

    /// Flush `{high_id, free_list}` to the checkpoint sidecar file
    /// (spec §4.2 `checkpoint()`).
    pub fn checkpoint(&self) -> Result<()> {
        let bytes = self.inner.with_sink(|inner| {
            let mut bytes = Vec::new();
            bytes.extend_from_slice(&self.high_id.load(Ordering::Acquire).to_le_bytes());
            bytes.extend_from_slice(&(inner.free_list.len() as u64).to_le_bytes());
            for id in &inner.free_list {
                bytes.extend_from_slice(&id.to_le_bytes());
            }
            bytes
        });
        std::fs::File::create(&self.checkpoint_path)?.write_all(&bytes)?;
        Ok(())
    }

    /// Reload `{high_id, free_list}` from the checkpoint sidecar file,
    /// if it exists.
    pub fn load_checkpoint(kind: RecordKind, checkpoint_path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = checkpoint_path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let mut bytes = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
        if bytes.len() < 16 {
            return Ok(None);
        }
        let high_id = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let count = u64::from_le_bytes(bytes[8..16].try_into().unwrap()) as usize;
        let mut free_list = VecDeque::with_capacity(count);
        let mut offset = 16;
        for _ in 0..count {
            free_list.push_back(u64::from_le_bytes(
                bytes[offset..offset + 8].try_into().unwrap(),
            ));
            offset += 8;
        }
        Ok(Some(Self {
            kind,
            high_id: AtomicU64::new(high_id),
            inner: WorkSync::new(Inner {
                free_list,
                pending: VecDeque::new(),
            }),
            checkpoint_path: path.to_path_buf(),
        }))
    }
}
