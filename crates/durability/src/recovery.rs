//! Log replay for crash recovery (feeds C8's `RECOVERY`/`REVERSE_RECOVERY`
//! apply modes)
//!
//! Reads a command log from the start, decoding each record's payload
//! with [`crate::codec`] and stopping at the first torn or corrupted
//! record rather than scanning forward to skip it — proportionate to a
//! single-writer append-only file with no segment rotation, unlike the
//! teacher's multi-segment WAL reader which must hunt for the next
//! valid segment boundary.

use crate::codec::decode_batch;
use crate::log::LOG_HEADER_SIZE;
use graphkernel_core::command::Command;
use graphkernel_core::error::Result;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use tracing::warn;

/// One transaction's worth of replayed commands.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayedTransaction {
    /// The transaction id the commands were committed under.
    pub txn_id: u64,
    /// Commit timestamp in microseconds since the Unix epoch.
    pub timestamp_micros: u64,
    /// The decoded, ordered command batch.
    pub commands: Vec<Command>,
}

/// Why replay stopped before reaching the physical end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every byte in the file was consumed as a complete, valid record.
    EndOfFile,
    /// A length-prefixed record was truncated partway through — the
    /// expected shape of a write that was interrupted mid-append.
    TornWrite,
    /// A complete record was read but its checksum did not match.
    Corruption,
}

/// Read every complete, valid record from `path` in log order. Returns
/// the decoded transactions plus the reason replay stopped (normally
/// [`StopReason::EndOfFile`]) and the byte offset up to which the log
/// is known good, suitable for truncating away a torn tail before
/// resuming writes.
pub fn replay(path: impl AsRef<Path>) -> Result<(Vec<ReplayedTransaction>, StopReason, u64)> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(LOG_HEADER_SIZE))?;

    let mut transactions = Vec::new();
    let mut valid_end = LOG_HEADER_SIZE;
    let mut stop = StopReason::EndOfFile;

    loop {
        let before = valid_end;
        match crate::log::LogRecord::read_from(&mut reader) {
            Ok(crate::log::ReadOutcome::Record(record)) => {
                let commands = decode_batch(&record.payload)?;
                valid_end = before + 16 + record.payload.len() as u64 + 8;
                transactions.push(ReplayedTransaction {
                    txn_id: record.txn_id,
                    timestamp_micros: record.timestamp_micros,
                    commands,
                });
            }
            Ok(crate::log::ReadOutcome::CleanEnd) => {
                stop = StopReason::EndOfFile;
                break;
            }
            Ok(crate::log::ReadOutcome::TornWrite) => {
                warn!(offset = valid_end, "stopping log replay at a torn tail record");
                stop = StopReason::TornWrite;
                break;
            }
            Err(e) => {
                warn!(offset = valid_end, error = %e, "stopping log replay at a corrupted record");
                stop = StopReason::Corruption;
                break;
            }
        }
    }

    Ok((transactions, stop, valid_end))
}

/// Replay in reverse commit order, for `REVERSE_RECOVERY` undo of a
/// partially applied batch (spec §4.4 `ReverseRecovery` mode).
pub fn replay_reverse(path: impl AsRef<Path>) -> Result<Vec<ReplayedTransaction>> {
    let (mut transactions, _, _) = replay(path)?;
    transactions.reverse();
    Ok(transactions)
}
