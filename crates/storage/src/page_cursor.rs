//! Page-cursor seam
//!
//! Spec §1 treats the page cache as an external collaborator: "a
//! pinned-page mapping with per-thread cursor tracers". This crate does
//! not implement a page cache; it needs *some* positioned-I/O strategy
//! to be runnable, so it defines the narrow interface a real page
//! cache would satisfy and ships one concrete, unglamorous
//! implementation (`FileCursor`) backed by a plain `File` behind a
//! mutex. Swapping in a real mmap/page-cache implementation later means
//! writing a new `PageCursor`, not touching any store.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Positioned read/write access to a single store file.
///
/// Implementations must be safe to share across threads; callers may
/// issue concurrent reads and writes and rely on each call being
/// internally atomic with respect to its own byte range.
pub trait PageCursor: Send + Sync {
    /// Read exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Write exactly `buf` starting at `offset`.
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()>;

    /// Current file length in bytes.
    fn len(&self) -> io::Result<u64>;

    /// True if the file is empty.
    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Flush any buffering and fsync to disk.
    fn sync(&self) -> io::Result<()>;

    /// The path this cursor is backed by, for backup/replay file
    /// enumeration (spec §4.1: "each store exposes its storage file
    /// path ... for backup/replay enumeration").
    fn path(&self) -> &Path;
}

/// A [`PageCursor`] backed by a plain OS file behind a mutex.
///
/// Not a real page cache: every read/write is a syscall. Correct and
/// simple, which is what this spec needs from the storage layer since
/// the actual page cache is explicitly out of scope (spec §1).
pub struct FileCursor {
    file: Mutex<File>,
    path: PathBuf,
}

impl FileCursor {
    /// Open (creating if necessary) the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }
}

impl PageCursor for FileCursor {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut file = self.file.lock().unwrap();
        let needed = offset + buf.len() as u64;
        if file.metadata()?.len() < needed {
            file.set_len(needed)?;
        }
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.file.lock().unwrap().metadata()?.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.file.lock().unwrap().sync_all()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
