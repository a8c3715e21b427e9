//! Command log codec and crash-recovery replay
//!
//! Three pieces, matching C7's wire format and the `RECOVERY`/
//! `REVERSE_RECOVERY` apply modes:
//! - [`codec`] turns an ordered `Vec<Command>` batch into bytes and back.
//! - [`log`] is the append-only byte sink the engine commits through.
//! - [`recovery`] replays a log file into ordered transaction batches.

#![warn(missing_docs)]

pub mod codec;
pub mod log;
pub mod recovery;

pub use codec::{decode_batch, encode_batch, CODEC_FORMAT_VERSION};
pub use log::{FileLogSink, LogPosition, LogRecord, LogSink};
pub use recovery::{replay, replay_reverse, ReplayedTransaction, StopReason};
