use tokio::sync::mpsc;
use tracing::debug;

use crate::ChannelError;

/// An event observed on a channel endpoint.
///
/// The transport pushes these onto the endpoint's inbound queue in the
/// order they occurred; consumers drain the queue sequentially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is open and ready to carry messages.
    Opened,
    /// A discrete message from the remote endpoint.
    Message(Vec<u8>),
    /// The remote endpoint closed the channel.
    Closed,
    /// The transport failed; the channel is unusable.
    Error(String),
}

/// Outbound half of an open channel endpoint.
///
/// Wraps whatever queue the transport drains for this direction. The
/// transport guarantees messages arrive at the peer in `send` order;
/// this type never re-derives that.
pub struct Channel {
    outbound: mpsc::Sender<ChannelEvent>,
}

impl Channel {
    /// Wraps a transport-provided outbound queue.
    pub fn new(outbound: mpsc::Sender<ChannelEvent>) -> Self {
        Self { outbound }
    }

    /// Sends one discrete message to the remote endpoint.
    ///
    /// Waits if the transport's send buffer is full. Fails once the
    /// channel has been torn down.
    pub async fn send(&self, message: Vec<u8>) -> Result<(), ChannelError> {
        self.outbound
            .send(ChannelEvent::Message(message))
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Closes the channel, notifying the remote endpoint.
    ///
    /// Best-effort: closing an already-dead channel is not an error.
    pub async fn close(&self) {
        if self.outbound.send(ChannelEvent::Closed).await.is_err() {
            debug!("close on already-dead channel");
        }
    }

    /// Returns `true` once the peer endpoint is gone.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
