//! Ordered message channel abstraction.
//!
//! The transfer core never establishes connections itself; an external
//! peer-connection layer hands it an already-open [`Channel`] plus the
//! matching inbound [`ChannelEvent`] stream. The channel delivers
//! discrete messages in send order and reports open/close/error
//! transitions as events on the same queue, so consumers see one
//! sequential stream with no callback reentrancy.
//!
//! [`MemoryChannel`] provides a connected in-process endpoint pair for
//! tests and local demos.

mod error;
mod handle;
mod memory;

pub use error::ChannelError;
pub use handle::{Channel, ChannelEvent};
pub use memory::MemoryChannel;

/// Depth of each endpoint's inbound event queue.
///
/// A full queue makes `send` wait, which is the only backpressure the
/// in-memory transport has.
pub const EVENT_QUEUE_DEPTH: usize = 64;
