//! On-disk token record format
//!
//! Token names are capped at [`MAX_NAME_LEN`] bytes inline. Real schema
//! catalogs sometimes need longer names via a dynamic chain the way
//! properties do; this spec's token names (labels, relationship types,
//! property keys) are short identifiers in every scenario it covers, so
//! a single fixed slot is sufficient and keeps the token store simple.

use super::{DecodeError, RecordFormat};
use graphkernel_core::command::TokenRecord;
use graphkernel_core::ids::RecordKind;
use graphkernel_core::token::TokenKind;

/// Maximum inline UTF-8 byte length of a token name.
pub const MAX_NAME_LEN: usize = 120;

fn kind_to_byte(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Label => 0,
        TokenKind::RelationshipType => 1,
        TokenKind::PropertyKey => 2,
    }
}

fn kind_from_byte(b: u8) -> Result<TokenKind, DecodeError> {
    Ok(match b {
        0 => TokenKind::Label,
        1 => TokenKind::RelationshipType,
        2 => TokenKind::PropertyKey,
        other => return Err(DecodeError::MalformedField(format!("bad token kind {other}"))),
    })
}

impl RecordFormat for TokenRecord {
    const KIND: RecordKind = RecordKind::Token;
    // kind(1) + name_len(1) + name(MAX_NAME_LEN)
    const RECORD_SIZE: usize = 1 + 1 + 1 + MAX_NAME_LEN;

    fn encode(&self, buf: &mut [u8]) {
        buf[0] = kind_to_byte(self.kind);
        let bytes = self.name.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        buf[1] = len as u8;
        buf[2..2 + len].copy_from_slice(&bytes[..len]);
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
        let len = buf[1] as usize;
        if len > MAX_NAME_LEN {
            return Err(DecodeError::MalformedField(format!(
                "token name length {len} exceeds inline capacity"
            )));
        }
        let name = String::from_utf8(buf[2..2 + len].to_vec())
            .map_err(|e| DecodeError::MalformedField(e.to_string()))?;
        Ok(TokenRecord { kind, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let record = TokenRecord {
            kind: TokenKind::Label,
            name: "Person".to_string(),
        };
        let mut buf = vec![0u8; TokenRecord::RECORD_SIZE - 1];
        record.encode(&mut buf);
        assert_eq!(TokenRecord::decode(&buf).unwrap(), record);
    }
}
