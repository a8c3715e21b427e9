//! Dynamic chain blocks backing the overflow string/array stores
//!
//! A property value too large to inline (spec §4.3 "Property chains")
//! is split across one or more fixed-size blocks linked by `next`. Both
//! the dynamic string store and the dynamic array store use this same
//! block shape; only the [`RecordFormat::KIND`] differs, so that backup
//! and replay file enumeration can tell the two stores apart.

use super::{DecodeError, RecordFormat};
use byteorder::{ByteOrder, LittleEndian};
use graphkernel_core::ids::RecordKind;

/// Bytes of payload carried per block, after the 8-byte `next` pointer
/// and 1-byte `used_len`.
pub const BLOCK_DATA_LEN: usize = 120;

const NONE_ID: u64 = u64::MAX;

/// One block of a dynamic overflow chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicBlock {
    /// Next block in the chain, or `None` if this is the last block.
    pub next: Option<u64>,
    /// How many bytes of `data` are meaningful (the last block is
    /// usually only partially full).
    pub used_len: u8,
    /// The raw bytes for this block.
    pub data: [u8; BLOCK_DATA_LEN],
}

impl DynamicBlock {
    /// Build a block from a byte slice no longer than
    /// [`BLOCK_DATA_LEN`], linking to `next`.
    pub fn new(bytes: &[u8], next: Option<u64>) -> Self {
        assert!(bytes.len() <= BLOCK_DATA_LEN);
        let mut data = [0u8; BLOCK_DATA_LEN];
        data[..bytes.len()].copy_from_slice(bytes);
        DynamicBlock {
            next,
            used_len: bytes.len() as u8,
            data,
        }
    }

    /// The meaningful bytes of this block.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.used_len as usize]
    }

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_u64(&mut buf[0..8], self.next.unwrap_or(NONE_ID));
        buf[8] = self.used_len;
        buf[9..9 + BLOCK_DATA_LEN].copy_from_slice(&self.data);
    }

    fn decode_from(buf: &[u8]) -> Result<Self, DecodeError> {
        let expected = 9 + BLOCK_DATA_LEN;
        if buf.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        let next = match LittleEndian::read_u64(&buf[0..8]) {
            NONE_ID => None,
            v => Some(v),
        };
        let used_len = buf[8];
        let mut data = [0u8; BLOCK_DATA_LEN];
        data.copy_from_slice(&buf[9..9 + BLOCK_DATA_LEN]);
        Ok(DynamicBlock {
            next,
            used_len,
            data,
        })
    }
}

macro_rules! chain_store_wrapper {
    ($name:ident, $kind:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub DynamicBlock);

        impl RecordFormat for $name {
            const KIND: RecordKind = $kind;
            const RECORD_SIZE: usize = 1 + 9 + BLOCK_DATA_LEN;

            fn encode(&self, buf: &mut [u8]) {
                self.0.encode_into(buf);
            }

            fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
                Ok($name(DynamicBlock::decode_from(buf)?))
            }
        }
    };
}

chain_store_wrapper!(
    StringChainBlock,
    RecordKind::DynamicString,
    "A block of the dynamic string overflow chain."
);
chain_store_wrapper!(
    ArrayChainBlock,
    RecordKind::DynamicArray,
    "A block of the dynamic array overflow chain."
);

/// Split `bytes` into a forward-linked chain of blocks, the first block
/// first. Caller assigns ids and wires up `next` pointers once it knows
/// where each block will live; this only chunks the payload.
pub fn chunk(bytes: &[u8]) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return vec![&[]];
    }
    bytes.chunks(BLOCK_DATA_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_round_trips() {
        let block = DynamicBlock::new(b"hello world", Some(42));
        let mut buf = vec![0u8; StringChainBlock::RECORD_SIZE - 1];
        StringChainBlock(block.clone()).encode(&mut buf);
        let decoded = StringChainBlock::decode(&buf).unwrap();
        assert_eq!(decoded.0, block);
    }

    #[test]
    fn chunking_splits_long_payloads() {
        let bytes = vec![7u8; BLOCK_DATA_LEN * 2 + 5];
        let chunks = chunk(&bytes);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn chunking_empty_payload_yields_one_empty_chunk() {
        assert_eq!(chunk(&[]), vec![&[] as &[u8]]);
    }
}
