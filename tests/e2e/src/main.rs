fn main() {
    println!("Run `cargo test -p peerdrop-e2e` to execute end-to-end transfer tests.");
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use peerdrop_channel::MemoryChannel;
    use peerdrop_protocol::{CHUNK_SIZE, FileMeta};
    use peerdrop_transfer::{
        OutputCallback, Receiver, Sender, SenderConfig, TransferError, TransferEvent,
        TransferSession, TransferState,
    };

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    fn connected_sender_session() -> TransferSession {
        let mut session = TransferSession::new();
        session.apply(TransferEvent::ConnectRequested).unwrap();
        session.apply(TransferEvent::ChannelOpened).unwrap();
        session
    }

    type Captured = Arc<Mutex<Vec<(FileMeta, Vec<u8>)>>>;

    fn capture_output() -> (Captured, OutputCallback) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let callback: OutputCallback =
            Box::new(move |meta, bytes| sink.lock().unwrap().push((meta, bytes)));
        (captured, callback)
    }

    /// Runs a full sender-to-receiver transfer over an in-memory channel
    /// pair and returns both finished sessions plus the captured output.
    async fn run_transfer(
        data: &[u8],
        pacing: Duration,
    ) -> (
        Result<TransferSession, TransferError>,
        Result<TransferSession, TransferError>,
        Captured,
    ) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "payload.bin", data);

        let (sender_end, mut receiver_end) = MemoryChannel::pair();
        let (captured, callback) = capture_output();

        let sender_task = tokio::spawn(async move {
            let mut session = connected_sender_session();
            let sender = Sender::new(SenderConfig { pacing });
            sender
                .run(
                    &sender_end.channel,
                    &mut session,
                    &path,
                    &CancellationToken::new(),
                )
                .await
                .map(|()| session)
        });

        let receiver_task = tokio::spawn(async move {
            let mut session = TransferSession::new();
            let receiver = Receiver::new();
            receiver
                .run(
                    &mut receiver_end.events,
                    &mut session,
                    &CancellationToken::new(),
                    callback,
                )
                .await
                .map(|()| session)
        });

        let sender_result = sender_task.await.unwrap();
        let receiver_result = receiver_task.await.unwrap();
        (sender_result, receiver_result, captured)
    }

    #[tokio::test]
    async fn round_trip_reproduces_the_file_byte_for_byte() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let (sender, receiver, captured) = run_transfer(&data, Duration::ZERO).await;

        let sender = sender.unwrap();
        let receiver = receiver.unwrap();
        assert_eq!(sender.state(), TransferState::Completed);
        assert_eq!(receiver.state(), TransferState::Completed);
        assert_eq!(sender.progress_percent(), 100);
        assert_eq!(receiver.progress_percent(), 100);
        assert_eq!(receiver.transferred_bytes(), data.len() as u64);

        let outputs = captured.lock().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].1, data);
        assert_eq!(outputs[0].0.name, "payload.bin");
        assert_eq!(outputs[0].0.size, data.len() as u64);
    }

    #[tokio::test]
    async fn worked_example_forty_thousand_bytes() {
        let data = vec![0xA5u8; 40_000];
        let (sender, receiver, captured) = run_transfer(&data, Duration::ZERO).await;

        // 40000 bytes at 16384 per chunk: 16384 + 16384 + 7232.
        let sender = sender.unwrap();
        assert_eq!(sender.transferred_bytes(), 40_000);

        let receiver = receiver.unwrap();
        assert_eq!(receiver.state(), TransferState::Completed);
        assert_eq!(receiver.progress_percent(), 100);
        assert_eq!(receiver.chunks_received(), 0); // drained into the output

        let outputs = captured.lock().unwrap();
        assert_eq!(outputs[0].1.len(), 40_000);
    }

    #[tokio::test]
    async fn zero_byte_file_round_trips() {
        let (sender, receiver, captured) = run_transfer(&[], Duration::ZERO).await;

        assert_eq!(sender.unwrap().state(), TransferState::Completed);
        assert_eq!(receiver.unwrap().state(), TransferState::Completed);

        let outputs = captured.lock().unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].1.is_empty());
    }

    #[tokio::test]
    async fn transfer_survives_real_pacing() {
        // Small file, real 10ms pacing: just proves the paced path works.
        let data = vec![1u8; CHUNK_SIZE * 2 + 10];
        let (sender, receiver, _) = run_transfer(&data, Duration::from_millis(10)).await;
        assert!(sender.is_ok());
        assert!(receiver.is_ok());
    }

    #[tokio::test]
    async fn receiver_reset_tears_down_and_sender_sees_dead_channel() {
        let dir = tempfile::TempDir::new().unwrap();
        // Enough chunks that the sender cannot finish instantly.
        let data = vec![0u8; CHUNK_SIZE * 32];
        let path = create_test_file(dir.path(), "payload.bin", &data);

        let (sender_end, receiver_end) = MemoryChannel::pair();

        let receiver_cancel = CancellationToken::new();
        let receiver_task = {
            let cancel = receiver_cancel.clone();
            let mut receiver_end = receiver_end;
            tokio::spawn(async move {
                let mut session = TransferSession::new();
                let (_, callback) = capture_output();
                let result = Receiver::new()
                    .run(&mut receiver_end.events, &mut session, &cancel, callback)
                    .await;
                // Reset: tear down the session and drop the endpoint.
                session.reset();
                assert_eq!(session.state(), TransferState::Idle);
                result
            })
        };

        let sender_task = tokio::spawn(async move {
            let mut session = connected_sender_session();
            let sender = Sender::new(SenderConfig {
                pacing: Duration::from_millis(5),
            });
            let result = sender
                .run(
                    &sender_end.channel,
                    &mut session,
                    &path,
                    &CancellationToken::new(),
                )
                .await;
            (result, session)
        });

        // Let a few chunks through, then reset the receiver.
        tokio::time::sleep(Duration::from_millis(20)).await;
        receiver_cancel.cancel();

        let receiver_result = receiver_task.await.unwrap();
        assert!(matches!(receiver_result, Err(TransferError::Cancelled)));

        // With the receiving endpoint gone, the sender's next send fails
        // and its session lands in Error.
        let (sender_result, sender_session) = sender_task.await.unwrap();
        assert!(matches!(sender_result, Err(TransferError::Channel(_))));
        assert_eq!(sender_session.state(), TransferState::Error);
    }

    #[tokio::test]
    async fn sender_reset_mid_transfer_fails_the_receiver() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = vec![0u8; CHUNK_SIZE * 32];
        let path = create_test_file(dir.path(), "payload.bin", &data);

        let (sender_end, mut receiver_end) = MemoryChannel::pair();
        let sender_cancel = CancellationToken::new();

        let sender_task = {
            let cancel = sender_cancel.clone();
            tokio::spawn(async move {
                let mut session = connected_sender_session();
                let sender = Sender::new(SenderConfig {
                    pacing: Duration::from_millis(5),
                });
                let result = sender
                    .run(&sender_end.channel, &mut session, &path, &cancel)
                    .await;
                // Reset closes the channel so the peer finds out.
                sender_end.channel.close().await;
                session.reset();
                result
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        sender_cancel.cancel();

        let sender_result = sender_task.await.unwrap();
        assert!(matches!(sender_result, Err(TransferError::Cancelled)));

        let mut session = TransferSession::new();
        let (captured, callback) = capture_output();
        let receiver_result = Receiver::new()
            .run(
                &mut receiver_end.events,
                &mut session,
                &CancellationToken::new(),
                callback,
            )
            .await;

        // The receiver saw a close before any Complete: channel error,
        // nothing handed to the output.
        assert!(matches!(receiver_result, Err(TransferError::Channel(_))));
        assert_eq!(session.state(), TransferState::Error);
        assert!(captured.lock().unwrap().is_empty());
    }
}
