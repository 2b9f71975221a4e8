//! Wire protocol for peerdrop file transfers.
//!
//! One transfer is a strict packet sequence over an ordered message
//! channel: exactly one [`Packet::Meta`], then zero or more
//! [`Packet::Chunk`]s whose payload lengths sum to the declared file
//! size, then exactly one [`Packet::Complete`]. Packets are JSON on the
//! wire with binary payloads base64-encoded, so they survive any
//! text-capable transport unchanged.

pub mod packet;

pub use packet::{FileMeta, Packet, ProtocolError};

/// Maximum chunk payload size: 16 KiB.
///
/// Small enough to stay under the message-size limits of common data
/// channels; not negotiated, both ends assume it.
pub const CHUNK_SIZE: usize = 16 * 1024;
