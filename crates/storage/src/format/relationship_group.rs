//! On-disk relationship-group record format

use super::{DecodeError, RecordFormat};
use byteorder::{ByteOrder, LittleEndian};
use graphkernel_core::command::RelationshipGroupRecord;
use graphkernel_core::ids::{NodeId, RecordKind, RelationshipGroupId, RelationshipId, TokenId};

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

impl RecordFormat for RelationshipGroupRecord {
    const KIND: RecordKind = RecordKind::RelationshipGroup;
    // owning_node(8) + rel_type(8) + first_out(8) + first_in(8) + first_loop(8) + next(8)
    const RECORD_SIZE: usize = 1 + 8 * 6;

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u64(&mut buf[0..8], self.owning_node.id());
        LittleEndian::write_u64(&mut buf[8..16], self.rel_type.id());
        w(&mut buf[16..24], self.first_out.map(|x| x.id()));
        w(&mut buf[24..32], self.first_in.map(|x| x.id()));
        w(&mut buf[32..40], self.first_loop.map(|x| x.id()));
        w(&mut buf[40..48], self.next.map(|x| x.id()));
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let expected = Self::RECORD_SIZE - 1;
        if buf.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        Ok(RelationshipGroupRecord {
            owning_node: NodeId::new(LittleEndian::read_u64(&buf[0..8])),
            rel_type: TokenId::new(LittleEndian::read_u64(&buf[8..16])),
            first_out: r(&buf[16..24]).map(RelationshipId::new),
            first_in: r(&buf[24..32]).map(RelationshipId::new),
            first_loop: r(&buf[32..40]).map(RelationshipId::new),
            next: r(&buf[40..48]).map(RelationshipGroupId::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let record = RelationshipGroupRecord {
            owning_node: NodeId::new(1),
            rel_type: TokenId::new(2),
            first_out: Some(RelationshipId::new(10)),
            first_in: None,
            first_loop: None,
            next: Some(RelationshipGroupId::new(4)),
        };
        let mut buf = vec![0u8; RelationshipGroupRecord::RECORD_SIZE - 1];
        record.encode(&mut buf);
        assert_eq!(RelationshipGroupRecord::decode(&buf).unwrap(), record);
    }
}
