use std::{
    fmt, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{
        unix::{OwnedReadHalf, OwnedWriteHalf},
        UnixStream,
    },
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};
use wacli_core::{
    wire::{decode_inbound, encode_command, is_blank_line},
    Command, Entry, FrameError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect to {} failed: {source}", .path.display())]
    ConnectFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("framing error: {0}")]
    Framing(String),
    #[error("decode error: {0}")]
    Decode(#[source] FrameError),
    #[error("encode error: {0}")]
    Encode(#[source] FrameError),
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),
    #[error("connection closed locally")]
    Closed,
    #[error("not connected")]
    NotConnected,
}

/// What the receive loop hands to the task that owns the log.
#[derive(Debug)]
pub enum SyncEvent {
    Entry(Entry),
    Lost(ClientError),
}

/// One duplex connection to the bridge socket.
pub struct Connection {
    reader: FrameReader,
    writer: CommandWriter,
}

impl Connection {
    pub async fn connect(
        path: impl AsRef<Path>,
        max_frame_bytes: usize,
    ) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let stream =
            UnixStream::connect(path)
                .await
                .map_err(|source| ClientError::ConnectFailed {
                    path: path.to_path_buf(),
                    source,
                })?;
        let (reader_half, writer_half) = stream.into_split();
        Ok(Self {
            reader: FrameReader::new(reader_half, max_frame_bytes),
            writer: CommandWriter::new(writer_half, max_frame_bytes),
        })
    }

    pub async fn receive_frame(&mut self) -> Result<Entry, ClientError> {
        self.reader.receive_frame().await
    }

    pub async fn send_command(&mut self, command: &Command) -> Result<(), ClientError> {
        self.writer.send_command(command).await
    }

    /// Separates the directions so one task can read while another writes.
    pub fn into_split(self) -> (FrameReader, CommandWriter) {
        (self.reader, self.writer)
    }
}

pub struct FrameReader {
    reader: BufReader<OwnedReadHalf>,
    max_frame_bytes: usize,
}

impl FrameReader {
    fn new(reader: OwnedReadHalf, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_bytes,
        }
    }

    /// Reads the next non-blank line and decodes it as an entry.
    pub async fn receive_frame(&mut self) -> Result<Entry, ClientError> {
        // Room for the frame plus a CRLF terminator.
        let limit = self.max_frame_bytes as u64 + 2;
        loop {
            let mut line = Vec::new();
            let read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut line)
                .await
                .map_err(|err| ClientError::Framing(format!("read failed: {err}")))?;
            if read == 0 {
                return Err(ClientError::Framing("connection closed".to_string()));
            }
            if !line.ends_with(b"\n") {
                if read as u64 >= limit {
                    return Err(ClientError::Decode(FrameError::OversizedFrame {
                        size: read,
                        max: self.max_frame_bytes,
                    }));
                }
                return Err(ClientError::Framing(
                    "connection closed mid-frame".to_string(),
                ));
            }
            if is_blank_line(&line) {
                continue;
            }
            return decode_inbound(&line, self.max_frame_bytes).map_err(ClientError::Decode);
        }
    }
}

pub struct CommandWriter {
    writer: OwnedWriteHalf,
    max_frame_bytes: usize,
}

impl CommandWriter {
    fn new(writer: OwnedWriteHalf, max_frame_bytes: usize) -> Self {
        Self {
            writer,
            max_frame_bytes,
        }
    }

    /// Writes one command line and flushes before returning.
    pub async fn send_command(&mut self, command: &Command) -> Result<(), ClientError> {
        let frame =
            encode_command(command, self.max_frame_bytes).map_err(ClientError::Encode)?;
        self.writer
            .write_all(&frame)
            .await
            .map_err(ClientError::WriteFailed)?;
        self.writer.flush().await.map_err(ClientError::WriteFailed)
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

/// Runs the inbound side until the connection ends or `shutdown` flips.
///
/// Exactly one terminal [`SyncEvent::Lost`] is sent when the loop stops on its
/// own. On cancellation it is delivered only if the queue has room, so a full
/// queue never keeps the loop alive.
pub fn spawn_receive_loop(
    mut reader: FrameReader,
    tx: mpsc::Sender<SyncEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let result = tokio::select! {
                result = reader.receive_frame() => result,
                _ = shutdown.changed() => Err(ClientError::Closed),
            };
            match result {
                Ok(entry) => {
                    debug!(
                        event = "socket_frame_received",
                        kind = %entry.kind(),
                        timestamp = entry.timestamp()
                    );
                    if forward(&tx, SyncEvent::Entry(entry), &mut shutdown).await {
                        continue;
                    }
                    if *shutdown.borrow() {
                        warn!(event = "socket_receive_stopped", error = %ClientError::Closed);
                        let _ = tx.try_send(SyncEvent::Lost(ClientError::Closed));
                    } else {
                        debug!(event = "socket_receiver_dropped");
                    }
                    break;
                }
                Err(err) => {
                    warn!(event = "socket_receive_stopped", error = %err);
                    let _ = forward(&tx, SyncEvent::Lost(err), &mut shutdown).await;
                    break;
                }
            }
        }
    })
}

/// Queues one event unless shutdown is requested first.
async fn forward(
    tx: &mpsc::Sender<SyncEvent>,
    event: SyncEvent,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    if *shutdown.borrow() {
        return tx.try_send(event).is_ok();
    }
    tokio::select! {
        sent = tx.send(event) => sent.is_ok(),
        _ = shutdown.changed() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::UnixListener,
    };
    use wacli_core::{wire::encode_frame, Call, DEFAULT_MAX_FRAME_BYTES};

    fn call(timestamp: i64) -> Entry {
        Entry::Call(Call {
            id: 0,
            timestamp,
            call_id: format!("call-{timestamp}"),
            caller_jid: "5678@s.whatsapp.net".to_string(),
            caller_name: "Bob".to_string(),
            is_group: false,
            group_jid: String::new(),
            group_name: String::new(),
        })
    }

    async fn pair(max_frame_bytes: usize) -> (tempfile::TempDir, Connection, UnixStream) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("wacli.sock");
        let listener = UnixListener::bind(&path).expect("bind");
        let connection = Connection::connect(&path, max_frame_bytes)
            .await
            .expect("connect");
        let (peer, _) = listener.accept().await.expect("accept");
        (dir, connection, peer)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn connect_to_missing_socket_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.sock");
        let result = Connection::connect(&path, DEFAULT_MAX_FRAME_BYTES).await;
        match result {
            Err(ClientError::ConnectFailed { path: failed, .. }) => assert_eq!(failed, path),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("connect should fail"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn receive_skips_blank_lines_and_reports_close() {
        let (_dir, mut connection, mut peer) = pair(DEFAULT_MAX_FRAME_BYTES).await;
        let mut bytes = b"\n   \n".to_vec();
        bytes.extend_from_slice(&encode_frame(&call(5), DEFAULT_MAX_FRAME_BYTES).expect("encode"));
        peer.write_all(&bytes).await.expect("peer write");
        drop(peer);

        assert_eq!(connection.receive_frame().await.expect("frame"), call(5));
        assert!(matches!(
            connection.receive_frame().await,
            Err(ClientError::Framing(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn truncated_and_malformed_frames_are_terminal_errors() {
        let (_dir, mut connection, mut peer) = pair(DEFAULT_MAX_FRAME_BYTES).await;
        peer.write_all(b"{\"type\":\"call\",\"data\":{}}\n")
            .await
            .expect("peer write");
        let err = connection.receive_frame().await.expect_err("missing fields");
        assert!(matches!(err, ClientError::Decode(FrameError::Decode(_))));

        peer.write_all(b"{\"type\":\"mess").await.expect("partial");
        drop(peer);
        let err = connection.receive_frame().await.expect_err("truncated");
        match err {
            ClientError::Framing(reason) => assert!(reason.contains("mid-frame")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn oversized_line_is_rejected_without_buffering_it() {
        let (_dir, mut connection, mut peer) = pair(64).await;
        let writer = tokio::spawn(async move {
            let _ = peer.write_all(&[b'x'; 4096]).await;
            peer
        });
        let err = connection.receive_frame().await.expect_err("oversized");
        assert!(matches!(
            err,
            ClientError::Decode(FrameError::OversizedFrame { max: 64, .. })
        ));
        drop(writer.await.expect("join writer"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn send_command_writes_one_flushed_line() {
        let (_dir, connection, peer) = pair(DEFAULT_MAX_FRAME_BYTES).await;
        let (_reader, mut writer) = connection.into_split();
        let command = Command::Send {
            chat_jid: "1234@s.whatsapp.net".to_string(),
            text: "hello".to_string(),
        };
        writer.send_command(&command).await.expect("send");

        let mut peer = BufReader::new(peer);
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(3), peer.read_line(&mut line))
            .await
            .expect("read timeout")
            .expect("read line");
        assert!(line.ends_with('\n'));
        let decoded: Command = serde_json::from_str(line.trim_end()).expect("decode command");
        assert_eq!(decoded, command);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_unblocks_idle_receive_loop() {
        let (_dir, connection, _peer) = pair(DEFAULT_MAX_FRAME_BYTES).await;
        let (reader, _writer) = connection.into_split();
        let (tx, mut rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_receive_loop(reader, tx, shutdown_rx);

        shutdown_tx.send(true).expect("signal shutdown");
        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("loop did not stop")
            .expect("terminal event");
        assert!(matches!(event, SyncEvent::Lost(ClientError::Closed)));
        handle.await.expect("join loop");
        assert!(rx.recv().await.is_none());
    }
}
