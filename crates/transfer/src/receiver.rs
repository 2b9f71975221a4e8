use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use peerdrop_channel::ChannelEvent;
use peerdrop_protocol::{CHUNK_SIZE, FileMeta, Packet};

use crate::progress::{ProgressCallback, SpeedCalculator, TransferProgress};
use crate::session::{TransferEvent, TransferSession, TransferState};
use crate::TransferError;

/// Callback receiving the reconstructed file on successful completion.
///
/// Called exactly once per transfer, never on failure. Persisting or
/// presenting the bytes is the host's concern.
pub type OutputCallback = Box<dyn FnMut(FileMeta, Vec<u8>) + Send>;

/// Consumes packets from a channel's event stream and materializes the
/// file.
///
/// Arrival order is trusted to equal send order (the ordered-channel
/// contract); chunk `index`/`total` are validated as a defensive check
/// but never used to reorder.
pub struct Receiver {
    speed: SpeedCalculator,
    on_progress: Option<ProgressCallback>,
}

impl Receiver {
    pub fn new() -> Self {
        Self {
            speed: SpeedCalculator::new(None, None),
            on_progress: None,
        }
    }

    /// Registers a progress callback, invoked after every accepted chunk.
    pub fn on_progress(&mut self, callback: ProgressCallback) {
        self.on_progress = Some(callback);
    }

    /// Runs the assembler until the transfer completes or fails.
    ///
    /// Drains `events` sequentially; returning tears the loop down, so
    /// messages still queued for a reset session are simply never
    /// applied. Cancellation preempts waiting for the next event.
    pub async fn run(
        &self,
        events: &mut mpsc::Receiver<ChannelEvent>,
        session: &mut TransferSession,
        cancel: &CancellationToken,
        mut output: OutputCallback,
    ) -> Result<(), TransferError> {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("receiver cancelled");
                    return Err(TransferError::Cancelled);
                }
                event = events.recv() => event,
            };

            match event {
                None => {
                    session.fail("channel dropped");
                    return Err(TransferError::Channel("channel dropped".into()));
                }
                Some(ChannelEvent::Opened) => {
                    // Inbound open: a receiver goes straight to Connected.
                    if session.state() == TransferState::Idle {
                        session.apply(TransferEvent::ChannelOpened)?;
                        debug!(session = %session.id(), "channel open");
                    }
                }
                Some(ChannelEvent::Message(bytes)) => {
                    if self.handle_packet(&bytes, session, &mut output)? {
                        return Ok(());
                    }
                }
                Some(ChannelEvent::Closed) => {
                    warn!("channel closed mid-transfer");
                    session.fail("channel closed mid-transfer");
                    return Err(TransferError::Channel("channel closed".into()));
                }
                Some(ChannelEvent::Error(message)) => {
                    warn!(%message, "channel error");
                    session.fail(message.clone());
                    return Err(TransferError::Channel(message));
                }
            }
        }
    }

    /// Applies one wire message. Returns `true` when the transfer is
    /// done.
    fn handle_packet(
        &self,
        bytes: &[u8],
        session: &mut TransferSession,
        output: &mut OutputCallback,
    ) -> Result<bool, TransferError> {
        let packet = match Packet::decode(bytes) {
            Ok(p) => p,
            Err(e) => return Err(self.violation(session, e.to_string())),
        };

        match packet {
            Packet::Meta { meta } => {
                if session.state() != TransferState::Connected {
                    return Err(self.violation(
                        session,
                        format!("unexpected meta packet in state {:?}", session.state()),
                    ));
                }
                info!(name = %meta.name, size = meta.size, "incoming file transfer");
                session.begin_transfer(meta)?;
                self.speed.reset();
                self.emit_progress(session);
                Ok(false)
            }

            Packet::Chunk { index, total, payload } => {
                let Some(size) = session.meta().map(|m| m.size) else {
                    return Err(self.violation(session, "chunk before meta".into()));
                };
                if session.state() != TransferState::Transferring {
                    return Err(self.violation(
                        session,
                        format!("chunk packet in state {:?}", session.state()),
                    ));
                }

                // Defensive checks only; order itself is trusted from
                // the transport.
                let expected_index = session.chunks_received() as u32;
                if index != expected_index {
                    return Err(self.violation(
                        session,
                        format!("chunk index {index} out of sequence, expected {expected_index}"),
                    ));
                }
                let expected_total = size.div_ceil(CHUNK_SIZE as u64) as u32;
                if total != expected_total {
                    return Err(self.violation(
                        session,
                        format!("chunk total {total} disagrees with declared size ({expected_total} expected)"),
                    ));
                }

                let len = payload.len() as u64;
                session.push_chunk(payload);
                self.speed.add_sample(len);
                trace!(index, total, len, "chunk received");
                self.emit_progress(session);
                Ok(false)
            }

            Packet::Complete => {
                if session.state() != TransferState::Transferring {
                    return Err(self.violation(session, "complete before meta".into()));
                }
                let size = session.meta().map_or(0, |m| m.size);
                if session.chunks_received() == 0 && size > 0 {
                    return Err(
                        self.violation(session, "received completion with no data".into())
                    );
                }

                let file = match session.assemble() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "reassembly failed");
                        session.fail(e.to_string());
                        return Err(e);
                    }
                };
                session.apply(TransferEvent::TransferFinished)?;
                let meta = session
                    .meta()
                    .cloned()
                    .expect("meta present in completed transfer");
                info!(name = %meta.name, bytes = file.len(), "file transfer complete");
                output(meta, file);
                self.emit_progress(session);
                Ok(true)
            }
        }
    }

    fn violation(&self, session: &mut TransferSession, message: String) -> TransferError {
        warn!(%message, "protocol violation");
        session.fail(message.clone());
        TransferError::ProtocolViolation(message)
    }

    fn emit_progress(&self, session: &TransferSession) {
        if let Some(cb) = &self.on_progress {
            cb(TransferProgress {
                session_id: session.id().to_string(),
                state: session.state(),
                percent: session.progress_percent(),
                transferred_bytes: session.transferred_bytes(),
                total_bytes: session.meta().map_or(0, |m| m.size),
                bytes_per_second: self.speed.bytes_per_second(),
            });
        }
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}
