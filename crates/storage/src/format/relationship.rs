//! On-disk relationship record format

use super::{DecodeError, RecordFormat};
use byteorder::{ByteOrder, LittleEndian};
use graphkernel_core::command::RelationshipRecord;
use graphkernel_core::ids::{NodeId, PropertyId, RecordKind, RelationshipId, TokenId};

const NONE_ID: u64 = u64::MAX;

fn w(buf: &mut [u8], id: Option<u64>) {
    LittleEndian::write_u64(buf, id.unwrap_or(NONE_ID));
}

fn r(buf: &[u8]) -> Option<u64> {
    match LittleEndian::read_u64(buf) {
        NONE_ID => None,
        v => Some(v),
    }
}

impl RecordFormat for RelationshipRecord {
    const KIND: RecordKind = RecordKind::Relationship;
    const RECORD_SIZE: usize = 1 + 8 * 8;

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u64(&mut buf[0..8], self.first_node.id());
        LittleEndian::write_u64(&mut buf[8..16], self.second_node.id());
        LittleEndian::write_u64(&mut buf[16..24], self.rel_type.id());
        w(&mut buf[24..32], self.first_prev_rel.map(|x| x.id()));
        w(&mut buf[32..40], self.first_next_rel.map(|x| x.id()));
        w(&mut buf[40..48], self.second_prev_rel.map(|x| x.id()));
        w(&mut buf[48..56], self.second_next_rel.map(|x| x.id()));
        w(&mut buf[56..64], self.next_prop.map(|x| x.id()));
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let expected = Self::RECORD_SIZE - 1;
        if buf.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        Ok(RelationshipRecord {
            first_node: NodeId::new(LittleEndian::read_u64(&buf[0..8])),
            second_node: NodeId::new(LittleEndian::read_u64(&buf[8..16])),
            rel_type: TokenId::new(LittleEndian::read_u64(&buf[16..24])),
            first_prev_rel: r(&buf[24..32]).map(RelationshipId::new),
            first_next_rel: r(&buf[32..40]).map(RelationshipId::new),
            second_prev_rel: r(&buf[40..48]).map(RelationshipId::new),
            second_next_rel: r(&buf[48..56]).map(RelationshipId::new),
            next_prop: r(&buf[56..64]).map(PropertyId::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let record = RelationshipRecord {
            first_node: NodeId::new(1),
            second_node: NodeId::new(2),
            rel_type: TokenId::new(9),
            first_prev_rel: None,
            first_next_rel: Some(RelationshipId::new(5)),
            second_prev_rel: Some(RelationshipId::new(6)),
            second_next_rel: None,
            next_prop: Some(PropertyId::new(3)),
        };
        let mut buf = vec![0u8; RelationshipRecord::RECORD_SIZE - 1];
        record.encode(&mut buf);
        assert_eq!(RelationshipRecord::decode(&buf).unwrap(), record);
    }
}
