//! On-disk meta-data record format
//!
//! The meta-data store holds exactly one record: the durable kernel
//! version plus identifying information for the store as a whole
//! (spec §3 "Kernel Version", §4.7 "Upgrade Protocol").

use super::{DecodeError, RecordFormat};
use byteorder::{ByteOrder, LittleEndian};
use graphkernel_core::ids::RecordKind;
use graphkernel_core::kernel_version::KernelVersion;

/// The single persisted meta-data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaDataRecord {
    /// The durable on-disk format version.
    pub kernel_version: KernelVersion,
    /// Random id assigned when the store was created, used to detect
    /// mismatched store files during backup/restore.
    pub store_id: u128,
    /// Unix timestamp (seconds) the store was created.
    pub creation_time: i64,
}

impl RecordFormat for MetaDataRecord {
    const KIND: RecordKind = RecordKind::MetaData;
    // kernel_version(1) + store_id(16) + creation_time(8)
    const RECORD_SIZE: usize = 1 + 1 + 16 + 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[0] = self.kernel_version.to_byte();
        buf[1..17].copy_from_slice(&self.store_id.to_le_bytes());
        LittleEndian::write_i64(&mut buf[17..25], self.creation_time);
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let expected = Self::RECORD_SIZE - 1;
        if buf.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        let kernel_version = KernelVersion::from_byte(buf[0]).ok_or_else(|| {
            DecodeError::MalformedField(format!("unrecognised kernel version byte {}", buf[0]))
        })?;
        let mut store_id_bytes = [0u8; 16];
        store_id_bytes.copy_from_slice(&buf[1..17]);
        let store_id = u128::from_le_bytes(store_id_bytes);
        let creation_time = LittleEndian::read_i64(&buf[17..25]);
        Ok(MetaDataRecord {
            kernel_version,
            store_id,
            creation_time,
        })
    }
}
