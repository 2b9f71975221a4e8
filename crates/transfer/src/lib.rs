//! File transfer pipeline and state machine.
//!
//! A transfer moves one file over an already-open ordered message
//! channel: the sender segments it into bounded chunks and paces their
//! transmission, the receiver accumulates payloads in arrival order and
//! reassembles the original byte stream. Both roles share one lifecycle
//! (`Idle → Connecting → Connected → Transferring → Completed`/`Error`)
//! driven by a caller-owned [`TransferSession`].

mod chunker;
mod progress;
mod receiver;
mod sender;
mod session;

pub use chunker::FileChunker;
pub use progress::{ProgressCallback, SpeedCalculator, TransferProgress};
pub use receiver::{OutputCallback, Receiver};
pub use sender::{Sender, SenderConfig};
pub use session::{TransferEvent, TransferSession, TransferState, transition};

use std::time::Duration;

/// Delay between successive chunk sends.
///
/// A naive backpressure substitute: the channel's send buffer is assumed
/// bounded, and pacing keeps the sender from overrunning it. Tunable via
/// [`SenderConfig`], not a correctness requirement.
pub const PACING_INTERVAL: Duration = Duration::from_millis(10);

/// Errors produced by the transfer crate.
///
/// All variants are terminal for the current transfer: nothing is
/// retried, the only recovery is an explicit session reset.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("size mismatch: declared {expected} bytes, assembled {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("invalid transition: {event:?} in state {from:?}")]
    InvalidTransition {
        from: TransferState,
        event: TransferEvent,
    },

    #[error("cancelled")]
    Cancelled,
}
