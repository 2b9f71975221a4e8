use tokio::sync::mpsc;

use crate::{Channel, ChannelEvent, EVENT_QUEUE_DEPTH};

/// One endpoint of a connected in-process channel pair.
///
/// Everything one side sends appears, in order, as
/// [`ChannelEvent::Message`]s on the other side's event queue. Both
/// queues start with a single [`ChannelEvent::Opened`] already enqueued,
/// matching the contract that the core only ever sees open channels.
pub struct MemoryChannel {
    pub channel: Channel,
    pub events: mpsc::Receiver<ChannelEvent>,
}

impl MemoryChannel {
    /// Creates a connected endpoint pair.
    pub fn pair() -> (MemoryChannel, MemoryChannel) {
        Self::pair_with_depth(EVENT_QUEUE_DEPTH)
    }

    /// Creates a connected endpoint pair with a custom queue depth.
    pub fn pair_with_depth(depth: usize) -> (MemoryChannel, MemoryChannel) {
        let (a_tx, a_rx) = mpsc::channel(depth);
        let (b_tx, b_rx) = mpsc::channel(depth);

        // Both ends observe the open before any traffic.
        a_tx.try_send(ChannelEvent::Opened)
            .expect("fresh queue cannot be full");
        b_tx.try_send(ChannelEvent::Opened)
            .expect("fresh queue cannot be full");

        let a = MemoryChannel {
            channel: Channel::new(b_tx),
            events: a_rx,
        };
        let b = MemoryChannel {
            channel: Channel::new(a_tx),
            events: b_rx,
        };
        (a, b)
    }
}
