//! Append-only command log (spec.md's WAL collaborator, §1 Non-goals:
//! "the physical transaction log ... treated as an append-only byte
//! sink with a cursor replay interface")
//!
//! [`LogSink`] is that collaborator's trait seam; [`FileLogSink`] is the
//! one concrete implementation needed to make the crate runnable.
//! Record framing is grounded on the teacher's
//! `durability/src/format/wal_record.rs` segment format, simplified from
//! multi-segment files with a 32-byte header to a single growing file
//! with an 8-byte header, since this crate has no segment rotation or
//! branch concept to encode.

use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher;
use graphkernel_core::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes identifying a command log file: "GKWL".
pub const LOG_MAGIC: [u8; 4] = *b"GKWL";

/// Current log file header format version.
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Size of the file header in bytes (magic + format version).
pub const LOG_HEADER_SIZE: u64 = 8;

/// Byte offset of one appended record, for recovery cursors and
/// truncation after a torn write.
pub type LogPosition = u64;

/// An append-only byte sink with a cursor replay interface. The engine
/// appends one command batch per committed transaction and never reads
/// through this trait; replay goes through [`crate::recovery`] instead.
pub trait LogSink: Send + Sync {
    /// Append one transaction's encoded command batch. Returns the
    /// offset the record was written at.
    fn append(&self, txn_id: u64, timestamp_micros: u64, payload: &[u8]) -> Result<LogPosition>;

    /// Force buffered writes to stable storage.
    fn flush(&self) -> Result<()>;

    /// Total bytes written so far, including the header.
    fn size(&self) -> Result<u64>;
}

/// A single decoded log record, as read back by [`crate::recovery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Transaction id this record was appended for.
    pub txn_id: u64,
    /// Commit timestamp in microseconds since the Unix epoch.
    pub timestamp_micros: u64,
    /// The encoded command batch (see [`crate::codec`]).
    pub payload: Vec<u8>,
}

impl LogRecord {
    /// Frame a record: `length(4) | txn_id(8) | timestamp(8) | payload | crc32(4)`.
    /// `length` covers everything between it and the trailing CRC.
    fn to_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(16 + self.payload.len());
        body.extend_from_slice(&self.txn_id.to_le_bytes());
        body.extend_from_slice(&self.timestamp_micros.to_le_bytes());
        body.extend_from_slice(&self.payload);

        let mut hasher = Hasher::new();
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut framed = Vec::with_capacity(4 + body.len() + 4);
        framed
            .write_u32::<LittleEndian>(body.len() as u32)
            .expect("write to Vec never fails");
        framed.extend_from_slice(&body);
        framed
            .write_u32::<LittleEndian>(crc)
            .expect("write to Vec never fails");
        framed
    }

    /// Parse one record from `reader`, positioned at its length prefix.
    /// Distinguishes a clean end of file (nothing more was ever written)
    /// from a torn tail (a length prefix or body truncated mid-write) so
    /// recovery can stop at either without raising an error; only an
    /// actual checksum mismatch on a complete record is reported as an
    /// error (spec §9 S6, recovery idempotence relies on both cases
    /// being handled the same way on repeated replay).
    pub(crate) fn read_from(reader: &mut impl Read) -> io::Result<ReadOutcome> {
        let mut len_buf = [0u8; 4];
        match fill(reader, &mut len_buf)? {
            Fill::Empty => return Ok(ReadOutcome::CleanEnd),
            Fill::Partial => return Ok(ReadOutcome::TornWrite),
            Fill::Full => {}
        }
        let body_len = u32::from_le_bytes(len_buf) as usize;
        if body_len < 16 {
            return Ok(ReadOutcome::TornWrite);
        }

        let mut body = vec![0u8; body_len];
        if !matches!(fill(reader, &mut body)?, Fill::Full) {
            return Ok(ReadOutcome::TornWrite);
        }

        let mut crc_buf = [0u8; 4];
        if !matches!(fill(reader, &mut crc_buf)?, Fill::Full) {
            return Ok(ReadOutcome::TornWrite);
        }
        let stored_crc = u32::from_le_bytes(crc_buf);

        let mut hasher = Hasher::new();
        hasher.update(&body);
        if hasher.finalize() != stored_crc {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "log record checksum mismatch"));
        }

        let txn_id = u64::from_le_bytes(body[0..8].try_into().unwrap());
        let timestamp_micros = u64::from_le_bytes(body[8..16].try_into().unwrap());
        let payload = body[16..].to_vec();
        Ok(ReadOutcome::Record(LogRecord { txn_id, timestamp_micros, payload }))
    }
}

/// The result of [`LogRecord::read_from`]: a full record, a clean
/// end-of-file, or a torn (incomplete) tail.
pub(crate) enum ReadOutcome {
    /// A complete, checksum-valid record.
    Record(LogRecord),
    /// No more bytes remain; the file ends exactly on a record boundary.
    CleanEnd,
    /// Fewer bytes remain than a complete record requires.
    TornWrite,
}

enum Fill {
    Empty,
    Partial,
    Full,
}

/// Read up to `buf.len()` bytes, reporting whether zero, some, or all
/// of `buf` was filled before EOF — `std::io::Read::read_exact` cannot
/// distinguish these cases, but recovery needs to.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<Fill> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(match total {
        0 => Fill::Empty,
        n if n == buf.len() => Fill::Full,
        _ => Fill::Partial,
    })
}

struct Header {
    magic: [u8; 4],
    format_version: u32,
}

impl Header {
    fn to_bytes(&self) -> [u8; LOG_HEADER_SIZE as usize] {
        let mut bytes = [0u8; LOG_HEADER_SIZE as usize];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; LOG_HEADER_SIZE as usize]) -> Option<Self> {
        let magic: [u8; 4] = bytes[0..4].try_into().ok()?;
        let format_version = u32::from_le_bytes(bytes[4..8].try_into().ok()?);
        if magic != LOG_MAGIC {
            return None;
        }
        Some(Header { magic, format_version })
    }
}

/// A single-file, append-only command log.
pub struct FileLogSink {
    file: Mutex<File>,
    path: PathBuf,
}

impl FileLogSink {
    /// Open `path`, creating a fresh header if it does not exist.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        if existed && file.metadata()?.len() >= LOG_HEADER_SIZE {
            let mut header_bytes = [0u8; LOG_HEADER_SIZE as usize];
            file.read_exact(&mut header_bytes)?;
            let header = Header::from_bytes(&header_bytes).ok_or_else(|| {
                Error::Serialization(format!("{}: invalid log header", path.display()))
            })?;
            if header.format_version != LOG_FORMAT_VERSION {
                return Err(Error::Serialization(format!(
                    "{}: unsupported log format version {}",
                    path.display(),
                    header.format_version
                )));
            }
        } else {
            file.set_len(0)?;
            file.write_all(&Header { magic: LOG_MAGIC, format_version: LOG_FORMAT_VERSION }.to_bytes())?;
        }
        file.seek(SeekFrom::End(0))?;

        Ok(Self { file: Mutex::new(file), path })
    }

    /// The file this log is backed by.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn append(&self, txn_id: u64, timestamp_micros: u64, payload: &[u8]) -> Result<LogPosition> {
        let mut file = self.file.lock();
        let offset = file.seek(SeekFrom::End(0))?;
        let record = LogRecord { txn_id, timestamp_micros, payload: payload.to_vec() };
        file.write_all(&record.to_bytes())?;
        Ok(offset)
    }

    fn flush(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }
}
