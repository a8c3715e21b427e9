//! Command batch wire format (C7's wire format)
//!
//! A batch is the ordered command sequence [`command_extractor`] (in
//! `graphkernel-engine`) produces for one transaction. The codec's only
//! job is to turn that `Vec<Command>` into bytes and back, byte-for-byte
//! stable for a given format version so recovery replay can rely on it.

use graphkernel_core::command::Command;
use graphkernel_core::error::{Error, Result};

/// Wire format version for an encoded command batch. Bumped only if the
/// envelope around the command list changes; individual commands carry
/// their own `format_version` tag (spec §3).
pub const CODEC_FORMAT_VERSION: u8 = 1;

/// Encode an ordered command batch for appending to the log.
pub fn encode_batch(commands: &[Command]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(1 + commands.len() * 64);
    out.push(CODEC_FORMAT_VERSION);
    bincode::serialize_into(&mut out, commands)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(out)
}

/// Decode a command batch previously produced by [`encode_batch`].
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<Command>> {
    let Some((&version, payload)) = bytes.split_first() else {
        return Err(Error::Serialization("empty command batch".into()));
    };
    if version != CODEC_FORMAT_VERSION {
        return Err(Error::Serialization(format!(
            "unsupported command batch codec version {version}"
        )));
    }
    bincode::deserialize(payload).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkernel_core::command::{MetaDataCmd, NodeCmd, NodeRecord};
    use graphkernel_core::ids::NodeId;
    use graphkernel_core::kernel_version::KernelVersion;
    use smallvec::smallvec;

    fn sample_commands() -> Vec<Command> {
        vec![
            Command::MetaData(MetaDataCmd {
                before: KernelVersion::V0,
                after: KernelVersion::V1,
            }),
            Command::Node(NodeCmd::new(
                NodeId::new(1),
                None,
                Some(NodeRecord {
                    next_rel: None,
                    next_prop: None,
                    labels: smallvec![],
                    is_dense: false,
                    relationship_group: None,
                }),
            )),
        ]
    }

    #[test]
    fn round_trips_a_batch() {
        let commands = sample_commands();
        let bytes = encode_batch(&commands).unwrap();
        let decoded = decode_batch(&bytes).unwrap();
        assert_eq!(decoded, commands);
    }

    #[test]
    fn rejects_unsupported_version_byte() {
        let mut bytes = encode_batch(&sample_commands()).unwrap();
        bytes[0] = 0xFF;
        assert!(decode_batch(&bytes).is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(decode_batch(&[]).is_err());
    }
}
