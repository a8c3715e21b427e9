//! On-disk property record format
//!
//! A property record slot never stores a full [`graphkernel_core::value::PropertyValue`]
//! directly — the value may be larger than fits in a fixed slot. Instead
//! the slot stores a small tagged union: scalars and short strings are
//! inlined; longer strings and all arrays are stored as a pointer into
//! the dynamic string/array chain (see [`super::dynamic`]). Resolving a
//! dynamic pointer into a full value requires reading the chain store,
//! which is `PropertyStore`'s job (in `crate::property_store`), not
//! this module's — this module only knows how to get the tagged union
//! on and off disk.

use super::{DecodeError, RecordFormat};
use byteorder::{ByteOrder, LittleEndian};
use graphkernel_core::ids::{PropertyId, RecordKind, TokenId};

/// Bytes of inline payload available per property record.
pub const INLINE_DATA_LEN: usize = 16;

const NONE_ID: u64 = u64::MAX;

/// Discriminates what `data` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    /// `data[0..8]` holds a little-endian `i64` cast from a `bool`.
    Bool,
    /// `data[0..8]` holds a little-endian `i64`.
    Int,
    /// `data[0..8]` holds a little-endian `f64`'s bits.
    Float,
    /// `data` holds up to [`INLINE_DATA_LEN`] bytes of UTF-8, inline.
    InlineString,
    /// `data[0..8]` is the first block id, `data[8..16]` the total byte
    /// length, of a dynamic-string chain.
    DynamicString,
    /// Same layout as `DynamicString`, but the chain holds a bincode
    /// `Vec<i64>`.
    DynamicIntArray,
    /// Same layout, chain holds a bincode `Vec<String>`.
    DynamicStringArray,
}

impl ValueTag {
    fn to_byte(self) -> u8 {
        match self {
            ValueTag::Bool => 0,
            ValueTag::Int => 1,
            ValueTag::Float => 2,
            ValueTag::InlineString => 3,
            ValueTag::DynamicString => 4,
            ValueTag::DynamicIntArray => 5,
            ValueTag::DynamicStringArray => 6,
        }
    }

    fn from_byte(b: u8) -> Result<Self, DecodeError> {
        Ok(match b {
            0 => ValueTag::Bool,
            1 => ValueTag::Int,
            2 => ValueTag::Float,
            3 => ValueTag::InlineString,
            4 => ValueTag::DynamicString,
            5 => ValueTag::DynamicIntArray,
            6 => ValueTag::DynamicStringArray,
            other => return Err(DecodeError::MalformedField(format!("bad value tag {other}"))),
        })
    }
}

/// The on-disk shape of a property record slot.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskPropertyRecord {
    /// The property key.
    pub key: TokenId,
    /// Next property in the owning entity's chain.
    pub next: Option<PropertyId>,
    /// What `data` means.
    pub tag: ValueTag,
    /// Tag-dependent payload, always [`INLINE_DATA_LEN`] bytes wide.
    pub data: [u8; INLINE_DATA_LEN],
}

impl DiskPropertyRecord {
    /// Read the `(first_block_id, total_len)` pair out of `data` for a
    /// dynamic-tagged record. Panics if `tag` is not a dynamic variant;
    /// callers are expected to check `tag` first.
    pub fn dynamic_pointer(&self) -> (u64, u64) {
        (
            LittleEndian::read_u64(&self.data[0..8]),
            LittleEndian::read_u64(&self.data[8..16]),
        )
    }

    /// Build a record pointing at a dynamic chain.
    pub fn with_dynamic_pointer(
        key: TokenId,
        next: Option<PropertyId>,
        tag: ValueTag,
        first_block: u64,
        total_len: u64,
    ) -> Self {
        let mut data = [0u8; INLINE_DATA_LEN];
        LittleEndian::write_u64(&mut data[0..8], first_block);
        LittleEndian::write_u64(&mut data[8..16], total_len);
        DiskPropertyRecord {
            key,
            next,
            tag,
            data,
        }
    }
}

impl RecordFormat for DiskPropertyRecord {
    const KIND: RecordKind = RecordKind::Property;
    // key(8) + next(8) + tag(1) + data(16)
    const RECORD_SIZE: usize = 1 + 8 + 8 + 1 + INLINE_DATA_LEN;

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u64(&mut buf[0..8], self.key.id());
        LittleEndian::write_u64(&mut buf[8..16], self.next.map(|p| p.id()).unwrap_or(NONE_ID));
        buf[16] = self.tag.to_byte();
        buf[17..17 + INLINE_DATA_LEN].copy_from_slice(&self.data);
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let expected = Self::RECORD_SIZE - 1;
        if buf.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        let key = TokenId::new(LittleEndian::read_u64(&buf[0..8]));
        let next = match LittleEndian::read_u64(&buf[8..16]) {
            NONE_ID => None,
            v => Some(PropertyId::new(v)),
        };
        let tag = ValueTag::from_byte(buf[16])?;
        let mut data = [0u8; INLINE_DATA_LEN];
        data.copy_from_slice(&buf[17..17 + INLINE_DATA_LEN]);
        Ok(DiskPropertyRecord {
            key,
            next,
            tag,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_int_round_trips() {
        let mut data = [0u8; INLINE_DATA_LEN];
        LittleEndian::write_i64(&mut data[0..8], -7);
        let record = DiskPropertyRecord {
            key: TokenId::new(1),
            next: Some(PropertyId::new(2)),
            tag: ValueTag::Int,
            data,
        };
        let mut buf = vec![0u8; DiskPropertyRecord::RECORD_SIZE - 1];
        record.encode(&mut buf);
        assert_eq!(DiskPropertyRecord::decode(&buf).unwrap(), record);
    }

    #[test]
    fn dynamic_pointer_round_trips() {
        let record = DiskPropertyRecord::with_dynamic_pointer(
            TokenId::new(3),
            None,
            ValueTag::DynamicString,
            99,
            500,
        );
        let mut buf = vec![0u8; DiskPropertyRecord::RECORD_SIZE - 1];
        record.encode(&mut buf);
        let decoded = DiskPropertyRecord::decode(&buf).unwrap();
        assert_eq!(decoded.dynamic_pointer(), (99, 500));
    }
}
