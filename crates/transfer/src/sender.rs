use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use peerdrop_channel::Channel;
use peerdrop_protocol::Packet;

use crate::chunker::FileChunker;
use crate::progress::{ProgressCallback, SpeedCalculator, TransferProgress};
use crate::session::{TransferEvent, TransferSession};
use crate::{PACING_INTERVAL, TransferError};

/// Tunables for the sender pipeline.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Delay between successive chunk sends.
    pub pacing: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            pacing: PACING_INTERVAL,
        }
    }
}

/// Drives one file through an open channel to completion.
///
/// Owns the source file handle for the duration of the transfer; channel
/// sends are its only externally observable effect.
pub struct Sender {
    config: SenderConfig,
    speed: SpeedCalculator,
    on_progress: Option<ProgressCallback>,
}

impl Sender {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            speed: SpeedCalculator::new(None, None),
            on_progress: None,
        }
    }

    /// Registers a progress callback, invoked after every chunk send.
    pub fn on_progress(&mut self, callback: ProgressCallback) {
        self.on_progress = Some(callback);
    }

    /// Sends the file at `path` over `channel`.
    ///
    /// The session must be `Connected`. On channel or file-read failure
    /// the pipeline stops immediately and the session moves to `Error`;
    /// there are no resume semantics. Cancellation preempts the pacing
    /// delay and stops chunk production without touching the session —
    /// the reset that triggered it tears the session down itself.
    pub async fn run(
        &self,
        channel: &Channel,
        session: &mut TransferSession,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let mut chunker = match FileChunker::open(path) {
            Ok(c) => c,
            Err(e) => {
                session.fail(e.to_string());
                return Err(e);
            }
        };
        let meta = chunker.meta().clone();
        let total = chunker.total_chunks();

        // Meta is a synchronous handoff point: no chunking yet.
        session.begin_transfer(meta.clone())?;
        info!(
            name = %meta.name,
            size = meta.size,
            chunks = total,
            "starting file transfer"
        );
        self.send_packet(channel, session, Packet::Meta { meta }).await?;

        loop {
            if cancel.is_cancelled() {
                debug!("sender cancelled");
                return Err(TransferError::Cancelled);
            }

            let (index, payload) = match chunker.next_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    session.fail(e.to_string());
                    return Err(e);
                }
            };

            let len = payload.len() as u64;
            self.send_packet(channel, session, Packet::Chunk { index, total, payload })
                .await?;
            session.record_bytes(len);
            self.speed.add_sample(len);
            self.emit_progress(session);
            trace!(index, total, len, "chunk sent");

            if index + 1 < total {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("sender cancelled during pacing");
                        return Err(TransferError::Cancelled);
                    }
                    _ = tokio::time::sleep(self.config.pacing) => {}
                }
            }
        }

        self.send_packet(channel, session, Packet::Complete).await?;
        session.apply(TransferEvent::TransferFinished)?;
        self.emit_progress(session);
        info!(bytes = session.transferred_bytes(), "file transfer complete");
        Ok(())
    }

    async fn send_packet(
        &self,
        channel: &Channel,
        session: &mut TransferSession,
        packet: Packet,
    ) -> Result<(), TransferError> {
        let bytes = match packet.encode() {
            Ok(b) => b,
            Err(e) => {
                session.fail(e.to_string());
                return Err(TransferError::ProtocolViolation(e.to_string()));
            }
        };
        if let Err(e) = channel.send(bytes).await {
            session.fail(e.to_string());
            return Err(TransferError::Channel(e.to_string()));
        }
        Ok(())
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
