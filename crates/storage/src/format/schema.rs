//! On-disk schema-rule record format

use super::{DecodeError, RecordFormat};
use byteorder::{ByteOrder, LittleEndian};
use graphkernel_core::command::{ConstraintKind, SchemaRecord};
use graphkernel_core::ids::{RecordKind, TokenId};
use smallvec::SmallVec;

/// Inline property-key capacity per schema rule.
pub const MAX_INLINE_PROPERTY_KEYS: usize = 8;

fn kind_to_byte(kind: ConstraintKind) -> u8 {
    match kind {
        ConstraintKind::Existence => 0,
        ConstraintKind::Uniqueness => 1,
        ConstraintKind::Index => 2,
    }
}

fn kind_from_byte(b: u8) -> Result<ConstraintKind, DecodeError> {
    Ok(match b {
        0 => ConstraintKind::Existence,
        1 => ConstraintKind::Uniqueness,
        2 => ConstraintKind::Index,
        other => {
            return Err(DecodeError::MalformedField(format!(
                "bad constraint kind {other}"
            )))
        }
    })
}

impl RecordFormat for SchemaRecord {
    const KIND: RecordKind = RecordKind::Schema;
    // kind(1) + label_or_rel_type(8) + count(1) + keys(8*N)
    const RECORD_SIZE: usize = 1 + 1 + 8 + 1 + MAX_INLINE_PROPERTY_KEYS * 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[0] = kind_to_byte(self.kind);
        LittleEndian::write_u64(&mut buf[1..9], self.label_or_rel_type.id());
        let count = self.property_keys.len().min(MAX_INLINE_PROPERTY_KEYS) as u8;
        buf[9] = count;
        let region = &mut buf[10..10 + MAX_INLINE_PROPERTY_KEYS * 8];
        for (i, slot) in region.chunks_mut(8).enumerate() {
            let v = self.property_keys.get(i).map(|t| t.id()).unwrap_or(0);
            LittleEndian::write_u64(slot, v);
        }
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let expected = Self::RECORD_SIZE - 1;
        if buf.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        let kind = kind_from_byte(buf[0])?;
        let label_or_rel_type = TokenId::new(LittleEndian::read_u64(&buf[1..9]));
        let count = buf[9] as usize;
        if count > MAX_INLINE_PROPERTY_KEYS {
            return Err(DecodeError::MalformedField(format!(
                "property key count {count} exceeds inline capacity"
            )));
        }
        let region = &buf[10..10 + MAX_INLINE_PROPERTY_KEYS * 8];
        let mut property_keys: SmallVec<[TokenId; 4]> = SmallVec::with_capacity(count);
        for slot in region.chunks(8).take(count) {
            property_keys.push(TokenId::new(LittleEndian::read_u64(slot)));
        }
        Ok(SchemaRecord {
            kind,
            label_or_rel_type,
            property_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let record = SchemaRecord {
            kind: ConstraintKind::Uniqueness,
            label_or_rel_type: TokenId::new(4),
            property_keys: SmallVec::from_vec(vec![TokenId::new(1), TokenId::new(2)]),
        };
        let mut buf = vec![0u8; SchemaRecord::RECORD_SIZE - 1];
        record.encode(&mut buf);
        assert_eq!(SchemaRecord::decode(&buf).unwrap(), record);
    }
}
