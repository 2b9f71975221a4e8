use serde::{Deserialize, Serialize};
use uuid::Uuid;

use peerdrop_protocol::FileMeta;

use crate::TransferError;

/// Lifecycle state shared by both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferState {
    Idle,
    Connecting,
    Connected,
    Transferring,
    Completed,
    Error,
}

/// An input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// A connect attempt to a remote identifier was initiated (sender
    /// role only; a receiver goes straight to `Connected` on an inbound
    /// open).
    ConnectRequested,
    /// The channel reported open.
    ChannelOpened,
    /// First meta handoff: the sender began sending, or the receiver
    /// processed its first `Meta`.
    TransferStarted,
    /// All payload delivered and the terminal packet processed.
    TransferFinished,
    /// Channel error or protocol violation.
    Failed,
    /// Explicit user reset.
    Reset,
}

/// Pure transition function for the transfer lifecycle.
///
/// `Completed` and `Error` are terminal; only `Reset` leaves them. Any
/// pair not in the table is invalid.
pub fn transition(
    state: TransferState,
    event: TransferEvent,
) -> Result<TransferState, TransferError> {
    use TransferEvent as E;
    use TransferState as S;

    match (state, event) {
        (_, E::Reset) => Ok(S::Idle),
        (_, E::Failed) => Ok(S::Error),
        (S::Idle, E::ConnectRequested) => Ok(S::Connecting),
        (S::Idle | S::Connecting, E::ChannelOpened) => Ok(S::Connected),
        (S::Connected, E::TransferStarted) => Ok(S::Transferring),
        (S::Transferring, E::TransferFinished) => Ok(S::Completed),
        (from, event) => Err(TransferError::InvalidTransition { from, event }),
    }
}

/// Per-transfer mutable state owned by one endpoint.
///
/// Driven by a single sequential event stream, so it carries no locks.
/// The sender tracks bytes sent; the receiver additionally accumulates
/// payload buffers until reassembly.
#[derive(Debug)]
pub struct TransferSession {
    id: Uuid,
    state: TransferState,
    progress_percent: u8,
    meta: Option<FileMeta>,
    accumulated: Vec<Vec<u8>>,
    transferred_bytes: u64,
    error: Option<String>,
}

impl TransferSession {
    /// Creates a fresh `Idle` session.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: TransferState::Idle,
            progress_percent: 0,
            meta: None,
            accumulated: Vec::new(),
            transferred_bytes: 0,
            error: None,
        }
    }

    /// Session identity. Changes on every reset, so packets delivered to
    /// a torn-down session can be told apart and dropped.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn meta(&self) -> Option<&FileMeta> {
        self.meta.as_ref()
    }

    /// Bytes sent (sender) or received (receiver) so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// Human-readable failure message, present only in `Error`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of chunk payloads accumulated (receiver role).
    pub fn chunks_received(&self) -> usize {
        self.accumulated.len()
    }

    /// Applies a lifecycle event through the transition table.
    pub fn apply(&mut self, event: TransferEvent) -> Result<(), TransferError> {
        if event == TransferEvent::Reset {
            self.reset();
            return Ok(());
        }
        self.state = transition(self.state, event)?;
        if self.state == TransferState::Completed {
            self.progress_percent = 100;
        }
        Ok(())
    }

    /// Begins a transfer: stores the meta, clears buffers and counters,
    /// moves `Connected → Transferring`.
    pub fn begin_transfer(&mut self, meta: FileMeta) -> Result<(), TransferError> {
        self.state = transition(self.state, TransferEvent::TransferStarted)?;
        self.meta = Some(meta);
        self.accumulated.clear();
        self.transferred_bytes = 0;
        self.progress_percent = 0;
        Ok(())
    }

    /// Records `n` transferred payload bytes and recomputes progress.
    pub fn record_bytes(&mut self, n: u64) {
        self.transferred_bytes += n;
        let size = self.meta.as_ref().map_or(0, |m| m.size);
        let pct = percent(self.transferred_bytes, size);
        // Progress never moves backwards within one transfer.
        self.progress_percent = self.progress_percent.max(pct);
    }

    /// Appends one chunk payload in arrival order and records its bytes.
    pub fn push_chunk(&mut self, payload: Vec<u8>) {
        let len = payload.len() as u64;
        self.accumulated.push(payload);
        self.record_bytes(len);
    }

    /// Concatenates all accumulated payloads into the final byte
    /// sequence, verifying it matches the declared size exactly.
    ///
    /// Leaves the buffers empty on success; on mismatch nothing is
    /// truncated or padded, the error is terminal.
    pub fn assemble(&mut self) -> Result<Vec<u8>, TransferError> {
        let expected = self
            .meta
            .as_ref()
            .map(|m| m.size)
            .ok_or_else(|| TransferError::ProtocolViolation("complete before meta".into()))?;

        let actual: u64 = self.accumulated.iter().map(|c| c.len() as u64).sum();
        if actual != expected {
            return Err(TransferError::SizeMismatch { expected, actual });
        }

        let mut out = Vec::with_capacity(actual as usize);
        for chunk in self.accumulated.drain(..) {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// Moves to `Error` and records the failure message.
    pub fn fail(&mut self, message: impl Into<String>) {
        // `Failed` is legal from every state.
        self.state = transition(self.state, TransferEvent::Failed)
            .unwrap_or(TransferState::Error);
        self.error = Some(message.into());
    }

    /// Returns the session to a fresh `Idle` state, releasing all
    /// buffers and assuming a new identity.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for TransferSession {
    fn default() -> Self {
        Self::new()
    }
}

/// `round(bytes / size * 100)` clamped to 100, with 100 reserved for a
/// byte-complete transfer so rounding cannot report completion early. A
/// zero-size transfer is complete as soon as it exists.
fn percent(bytes: u64, size: u64) -> u8 {
    if size == 0 {
        return 100;
    }
    if bytes >= size {
        return 100;
    }
    let pct = (u128::from(bytes) * 100 + u128::from(size) / 2) / u128::from(size);
    pct.min(99) as u8
}
