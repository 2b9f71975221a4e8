use serde::{Deserialize, Serialize};

use crate::CHUNK_SIZE;

/// Errors produced while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed packet: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("chunk payload of {len} bytes exceeds the {CHUNK_SIZE}-byte limit")]
    OversizedChunk { len: usize },
}

/// Descriptor for the file being transferred.
///
/// Produced once by the sender from the source file's attributes;
/// consumed once by the receiver to size its buffers and label the
/// reconstructed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub name: String,
    /// Total file size in bytes.
    pub size: u64,
    pub mime_type: String,
}

/// A single message exchanged over the data channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Packet {
    /// File descriptor. Exactly one per transfer, always first.
    Meta { meta: FileMeta },
    /// One slice of file payload.
    ///
    /// `index` counts from 0 up to `total - 1`. Both fields are
    /// diagnostic: arrival order is trusted from the transport, the
    /// receiver never reorders by them.
    Chunk {
        index: u32,
        total: u32,
        #[serde(with = "base64_bytes")]
        payload: Vec<u8>,
    },
    /// Terminal marker. Exactly one per transfer, always last.
    Complete,
}

impl Packet {
    /// Serializes the packet to its wire form.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        self.check_payload_bound()?;
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a wire message into a packet.
    ///
    /// Anything that does not match one of the three variants is an
    /// error, never a panic; the caller treats it as a protocol
    /// violation.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let packet: Packet = serde_json::from_slice(bytes)?;
        packet.check_payload_bound()?;
        Ok(packet)
    }

    fn check_payload_bound(&self) -> Result<(), ProtocolError> {
        if let Packet::Chunk { payload, .. } = self {
            if payload.len() > CHUNK_SIZE {
                return Err(ProtocolError::OversizedChunk { len: payload.len() });
            }
        }
        Ok(())
    }
}

/// Custom base64 serde module so binary payloads travel inside JSON text.
mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
