use crate::client::{
    spawn_receive_loop, ClientError, CommandWriter, Connection, ConnectionState, SyncEvent,
};
use std::{error::Error as StdError, path::PathBuf};
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use wacli_core::{
    Command, Entry, HistorySource, LogError, LogStore, Message, Selection,
    DEFAULT_MAX_FRAME_BYTES,
};

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub socket_path: PathBuf,
    pub max_frame_bytes: usize,
    pub event_capacity: usize,
}

impl EngineConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Changes the view layer has to reflect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNotice {
    /// The whole log was (re)loaded.
    Reset { len: usize },
    Appended { index: usize },
    SelectionChanged { cursor: usize },
    /// The session is read-only from here on.
    ConnectionLost { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    Send,
    Reply,
}

impl ComposeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComposeMode::Send => "send",
            ComposeMode::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub mode: ComposeMode,
    pub target: usize,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("no entry selected")]
    NoSelection,
    #[error("compose target unavailable: {0}")]
    Target(#[from] LogError),
    #[error("calls cannot be replied to")]
    CallTarget,
    #[error("message text is empty")]
    EmptyText,
    #[error("not connected to socket")]
    NotConnected,
    #[error("send failed: {0}")]
    Write(#[source] ClientError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("history load failed: {0}")]
    History(#[source] Box<dyn StdError + Send + Sync>),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Connect(ClientError),
    #[error("already connected")]
    AlreadyConnected,
}

/// Owns the chat log, the cursor and the outbound half of the connection.
///
/// All mutation goes through `&mut self`; the inbound half runs in its own task
/// and only hands entries over through the channel returned by
/// [`SyncEngine::connect`].
pub struct SyncEngine {
    config: EngineConfig,
    log: LogStore,
    selection: Selection,
    state: ConnectionState,
    writer: Option<CommandWriter>,
    shutdown: Option<watch::Sender<bool>>,
    receive_task: Option<JoinHandle<()>>,
    lost_reason: Option<String>,
}

impl SyncEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            log: LogStore::new(),
            selection: Selection::new(),
            state: ConnectionState::Disconnected,
            writer: None,
            shutdown: None,
            receive_task: None,
            lost_reason: None,
        }
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn lost_reason(&self) -> Option<&str> {
        self.lost_reason.as_deref()
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        let cursor = self.selection.cursor()?;
        self.log.get(cursor).ok()
    }

    pub fn load_history<H: HistorySource>(
        &mut self,
        source: &H,
    ) -> Result<Vec<ViewNotice>, EngineError> {
        let entries = source
            .load_history()
            .map_err(|err| EngineError::History(Box::new(err)))?;
        self.load_entries(entries)
    }

    pub fn load_entries(&mut self, entries: Vec<Entry>) -> Result<Vec<ViewNotice>, EngineError> {
        self.log.load(entries)?;
        self.selection.reset_to_tail(self.log.len());
        info!(event = "history_merged", entries = self.log.len());

        let mut notices = vec![ViewNotice::Reset {
            len: self.log.len(),
        }];
        if let Some(cursor) = self.selection.cursor() {
            notices.push(ViewNotice::SelectionChanged { cursor });
        }
        Ok(notices)
    }

    /// Opens the socket and starts the receive loop.
    ///
    /// Entries and the terminal loss arrive on the returned receiver and must be
    /// fed back through [`SyncEngine::handle_event`].
    pub async fn connect(&mut self) -> Result<mpsc::Receiver<SyncEvent>, EngineError> {
        if self.state == ConnectionState::Connected {
            return Err(EngineError::AlreadyConnected);
        }
        self.state = ConnectionState::Connecting;
        info!(event = "socket_connecting", path = %self.config.socket_path.display());

        let connection =
            match Connection::connect(&self.config.socket_path, self.config.max_frame_bytes).await
            {
                Ok(connection) => connection,
                Err(err) => {
                    warn!(event = "socket_connect_failed", error = %err);
                    self.state = ConnectionState::Failed;
                    self.lost_reason = Some(err.to_string());
                    return Err(EngineError::Connect(err));
                }
            };

        let (reader, writer) = connection.into_split();
        let (tx, rx) = mpsc::channel(self.config.event_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.receive_task = Some(spawn_receive_loop(reader, tx, shutdown_rx));
        self.shutdown = Some(shutdown_tx);
        self.writer = Some(writer);
        self.state = ConnectionState::Connected;
        self.lost_reason = None;
        info!(event = "socket_connected", path = %self.config.socket_path.display());
        Ok(rx)
    }

    pub fn handle_event(&mut self, event: SyncEvent) -> Vec<ViewNotice> {
        match event {
            SyncEvent::Entry(entry) => self.ingest(entry),
            SyncEvent::Lost(err) => vec![self.mark_lost(err)],
        }
    }

    /// Appends one live entry, following it with the cursor when the tail was
    /// being viewed.
    pub fn ingest(&mut self, entry: Entry) -> Vec<ViewNotice> {
        let was_at_tail = self.selection.is_at_tail();
        if let Some(last) = self.log.last_index().and_then(|idx| self.log.get(idx).ok()) {
            if entry.timestamp() < last.timestamp() {
                debug!(
                    event = "entry_out_of_order",
                    timestamp = entry.timestamp(),
                    tail_timestamp = last.timestamp()
                );
            }
        }
        let kind = entry.kind();
        let index = self.log.append(entry);
        debug!(event = "entry_appended", index, kind = %kind, was_at_tail);

        let mut notices = vec![ViewNotice::Appended { index }];
        if self.selection.on_append(self.log.len(), was_at_tail) {
            if let Some(cursor) = self.selection.cursor() {
                notices.push(ViewNotice::SelectionChanged { cursor });
            }
        }
        notices
    }

    fn mark_lost(&mut self, err: ClientError) -> ViewNotice {
        let reason = err.to_string();
        self.state = match err {
            ClientError::Closed => ConnectionState::Disconnected,
            _ => ConnectionState::Failed,
        };
        warn!(event = "connection_lost", reason = %reason, state = %self.state);
        self.writer = None;
        self.shutdown = None;
        self.receive_task = None;
        self.lost_reason = Some(reason.clone());
        ViewNotice::ConnectionLost { reason }
    }

    pub fn select(&mut self, index: i64) -> Option<ViewNotice> {
        if !self.selection.select(index) {
            return None;
        }
        self.selection_notice()
    }

    pub fn move_selection(&mut self, delta: i64) -> Option<ViewNotice> {
        if !self.selection.move_by(delta) {
            return None;
        }
        self.selection_notice()
    }

    pub fn select_first(&mut self) -> Option<ViewNotice> {
        self.select(0)
    }

    pub fn select_last(&mut self) -> Option<ViewNotice> {
        self.select(i64::MAX)
    }

    fn selection_notice(&self) -> Option<ViewNotice> {
        self.selection
            .cursor()
            .map(|cursor| ViewNotice::SelectionChanged { cursor })
    }

    /// The message at `target` when it can receive a send or reply.
    pub fn compose_target(&self, target: usize) -> Result<&Message, ComposeError> {
        if self.log.is_empty() {
            return Err(ComposeError::NoSelection);
        }
        self.log
            .get(target)?
            .as_message()
            .ok_or(ComposeError::CallTarget)
    }

    /// Validates and sends a compose request, returning the command written.
    pub async fn compose(&mut self, request: ComposeRequest) -> Result<Command, ComposeError> {
        let message = self.compose_target(request.target)?;
        let text = request.text.trim();
        if text.is_empty() {
            return Err(ComposeError::EmptyText);
        }
        let command = build_command(request.mode, message, text);

        let Some(writer) = self.writer.as_mut() else {
            return Err(ComposeError::NotConnected);
        };
        info!(
            event = "command_send",
            action = command.action(),
            chat_jid = command.chat_jid()
        );
        match writer.send_command(&command).await {
            Ok(()) => Ok(command),
            Err(err) => {
                warn!(event = "command_send_failed", action = command.action(), error = %err);
                Err(ComposeError::Write(err))
            }
        }
    }

    pub async fn compose_selected(
        &mut self,
        mode: ComposeMode,
        text: impl Into<String>,
    ) -> Result<Command, ComposeError> {
        let target = self.selection.cursor().ok_or(ComposeError::NoSelection)?;
        self.compose(ComposeRequest {
            mode,
            target,
            text: text.into(),
        })
        .await
    }

    /// Closes the connection; the receive loop reports [`ClientError::Closed`].
    pub async fn disconnect(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(task) = self.receive_task.take() {
            let _ = task.await;
        }
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Disconnected;
        }
    }
}

fn build_command(mode: ComposeMode, message: &Message, text: &str) -> Command {
    match mode {
        ComposeMode::Send => Command::Send {
            chat_jid: message.chat_jid.clone(),
            text: text.to_string(),
        },
        ComposeMode::Reply => Command::Reply {
            chat_jid: message.chat_jid.clone(),
            message_id: message.message_id.clone(),
            sender_jid: message.sender_jid.clone(),
            text: text.to_string(),
        },
    }
}
