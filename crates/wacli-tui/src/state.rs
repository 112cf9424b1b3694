use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use tracing::{info, warn};
use wacli_core::{Entry, HALF_PAGE};
use wacli_sync::{ComposeError, ComposeMode, ComposeRequest, SyncEngine, ViewNotice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeState {
    pub mode: ComposeMode,
    pub target: usize,
    pub placeholder: String,
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNote {
    pub text: String,
    pub severity: Severity,
}

/// Work the key handler cannot finish synchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Submit(ComposeRequest),
    Copy(String),
}

pub struct App {
    pub engine: SyncEngine,
    pub list_state: ListState,
    pub compose: Option<ComposeState>,
    pub status_note: Option<StatusNote>,
    pub help_open: bool,
}

impl App {
    pub fn new(engine: SyncEngine) -> Self {
        let mut list_state = ListState::default();
        list_state.select(engine.selection().cursor());
        Self {
            engine,
            list_state,
            compose: None,
            status_note: None,
            help_open: false,
        }
    }

    pub fn apply_notices(&mut self, notices: Vec<ViewNotice>) {
        for notice in notices {
            match notice {
                ViewNotice::Reset { .. } | ViewNotice::SelectionChanged { .. } => {
                    self.list_state.select(self.engine.selection().cursor());
                }
                ViewNotice::Appended { .. } => {}
                ViewNotice::ConnectionLost { reason } => {
                    self.set_error(format!("connection lost: {reason} (read-only)"));
                }
            }
        }
    }

    pub fn apply_notice(&mut self, notice: Option<ViewNotice>) {
        if let Some(notice) = notice {
            self.apply_notices(vec![notice]);
        }
    }

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.status_note = Some(StatusNote {
            text: text.into(),
            severity: Severity::Info,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status_note = Some(StatusNote {
            text: text.into(),
            severity: Severity::Error,
        });
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if self.compose.is_some() {
            return self.handle_compose_key(key);
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return None;
        }
        if self.help_open {
            if key.code == KeyCode::Esc {
                self.help_open = false;
            }
            return None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => Some(Action::Quit),
            KeyCode::Char('d') if ctrl => self.moved(HALF_PAGE),
            KeyCode::Char('u') if ctrl => self.moved(-HALF_PAGE),
            _ if ctrl => None,
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Down | KeyCode::Char('j') => self.moved(1),
            KeyCode::Up | KeyCode::Char('k') => self.moved(-1),
            KeyCode::PageDown => self.moved(HALF_PAGE),
            KeyCode::PageUp => self.moved(-HALF_PAGE),
            KeyCode::Home | KeyCode::Char('g') => {
                let notice = self.engine.select_first();
                self.apply_notice(notice);
                None
            }
            KeyCode::End | KeyCode::Char('G') => {
                let notice = self.engine.select_last();
                self.apply_notice(notice);
                None
            }
            KeyCode::Enter => {
                self.open_compose(ComposeMode::Send);
                None
            }
            KeyCode::Char('r') => {
                self.open_compose(ComposeMode::Reply);
                None
            }
            KeyCode::Char('y') => self.copy_selected(),
            _ => None,
        }
    }

    fn moved(&mut self, delta: i64) -> Option<Action> {
        let notice = self.engine.move_selection(delta);
        self.apply_notice(notice);
        None
    }

    fn handle_compose_key(&mut self, key: KeyEvent) -> Option<Action> {
        let compose = self.compose.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.hide_compose();
                None
            }
            KeyCode::Enter => {
                let request = ComposeRequest {
                    mode: compose.mode,
                    target: compose.target,
                    text: compose.input.trim().to_string(),
                };
                self.hide_compose();
                if request.text.is_empty() {
                    return None;
                }
                Some(Action::Submit(request))
            }
            KeyCode::Backspace => {
                compose.input.pop();
                None
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                compose.input.push(ch);
                None
            }
            _ => None,
        }
    }

    /// Opens the compose overlay for the selected message; calls are skipped.
    pub fn open_compose(&mut self, mode: ComposeMode) {
        let Some(target) = self.engine.selection().cursor() else {
            return;
        };
        let message = match self.engine.compose_target(target) {
            Ok(message) => message,
            Err(ComposeError::CallTarget) => {
                self.set_info("calls cannot be answered from here");
                return;
            }
            Err(_) => return,
        };
        let placeholder = match mode {
            ComposeMode::Send => format!("Message to {}...", message.chat_name),
            ComposeMode::Reply => format!("Reply to {}...", message.sender_name),
        };
        self.compose = Some(ComposeState {
            mode,
            target,
            placeholder,
            input: String::new(),
        });
    }

    pub fn hide_compose(&mut self) {
        self.compose = None;
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.engine.selected_entry()
    }

    fn copy_selected(&mut self) -> Option<Action> {
        let text = self.selected_entry()?.as_message()?.text.clone();
        Some(Action::Copy(text))
    }

    pub async fn submit(&mut self, request: ComposeRequest) {
        let mode = request.mode;
        match self.engine.compose(request).await {
            Ok(command) => {
                info!(event = "compose_sent", action = command.action());
                self.set_info(format!("{} sent", mode.as_str()));
            }
            Err(ComposeError::NotConnected) => {
                self.set_error("Not connected to socket");
            }
            Err(err) => {
                warn!(event = "compose_failed", error = %err);
                self.set_error(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use wacli_core::{Call, Message};
    use wacli_sync::EngineConfig;

    fn message(id: i64, timestamp: i64) -> Entry {
        Entry::Message(Message {
            id,
            message_id: format!("mid-{id}"),
            timestamp,
            chat_jid: "team@g.us".to_string(),
            chat_name: "Team".to_string(),
            sender_jid: format!("{id}@s.whatsapp.net"),
            sender_name: format!("Sender {id}"),
            is_group: true,
            is_muted: false,
            is_reply_to_me: false,
            text: format!("message {id}"),
        })
    }

    fn call(id: i64, timestamp: i64) -> Entry {
        Entry::Call(Call {
            id,
            timestamp,
            call_id: format!("call-{id}"),
            caller_jid: "5678@s.whatsapp.net".to_string(),
            caller_name: "Bob".to_string(),
            is_group: false,
            group_jid: String::new(),
            group_name: String::new(),
        })
    }

    fn app_with(entries: Vec<Entry>) -> App {
        let mut engine = SyncEngine::new(EngineConfig::new(Path::new("/nonexistent.sock")));
        engine.load_entries(entries).expect("load");
        App::new(engine)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            assert_eq!(app.handle_key(key(KeyCode::Char(ch))), None);
        }
    }

    #[test]
    fn navigation_keys_drive_engine_selection() {
        let mut app = app_with((1..=40).map(|id| message(id, id)).collect());
        assert_eq!(app.list_state.selected(), Some(39));

        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.list_state.selected(), Some(38));
        app.handle_key(ctrl('u'));
        assert_eq!(app.list_state.selected(), Some(23));
        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.list_state.selected(), Some(0));
        app.handle_key(ctrl('d'));
        assert_eq!(app.engine.selection().cursor(), Some(15));
        app.handle_key(KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT));
        assert_eq!(app.list_state.selected(), Some(39));
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.list_state.selected(), Some(39));
    }

    #[test]
    fn quit_keys() {
        let mut app = app_with(Vec::new());
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(app.handle_key(ctrl('c')), Some(Action::Quit));
    }

    #[test]
    fn reply_compose_captures_target_and_submits_trimmed_text() {
        let mut app = app_with(vec![message(1, 10), message(2, 20)]);
        app.handle_key(key(KeyCode::Char('r')));
        let compose = app.compose.clone().expect("compose open");
        assert_eq!(compose.placeholder, "Reply to Sender 2...");
        assert_eq!(compose.target, 1);

        type_text(&mut app, " okk");
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.handle_key(key(KeyCode::Char(' '))), None);

        let action = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Submit(ComposeRequest {
                mode: ComposeMode::Reply,
                target: 1,
                text: "ok".to_string(),
            }))
        );
        assert!(app.compose.is_none());
    }

    #[test]
    fn compose_keys_do_not_navigate() {
        let mut app = app_with(vec![message(1, 10), message(2, 20)]);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            app.compose.as_ref().map(|compose| compose.placeholder.as_str()),
            Some("Message to Team...")
        );
        type_text(&mut app, "kq");
        assert_eq!(app.engine.selection().cursor(), Some(1));
        assert_eq!(app.compose.as_ref().map(|c| c.input.as_str()), Some("kq"));

        app.handle_key(key(KeyCode::Esc));
        assert!(app.compose.is_none());
    }

    #[test]
    fn empty_compose_closes_without_submitting() {
        let mut app = app_with(vec![message(1, 10)]);
        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, "   ");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert!(app.compose.is_none());
    }

    #[test]
    fn call_selection_does_not_open_compose() {
        let mut app = app_with(vec![message(1, 10), call(1, 20)]);
        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.compose.is_none());
        app.handle_key(key(KeyCode::Enter));
        assert!(app.compose.is_none());
        assert_eq!(app.handle_key(key(KeyCode::Char('y'))), None);
    }

    #[test]
    fn copy_returns_selected_message_text() {
        let mut app = app_with(vec![message(1, 10)]);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('y'))),
            Some(Action::Copy("message 1".to_string()))
        );
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let mut app = app_with(vec![message(1, 10), message(2, 20)]);
        app.handle_key(key(KeyCode::Char('?')));
        assert!(app.help_open);
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), None);
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.engine.selection().cursor(), Some(1));
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.help_open);
    }

    #[test]
    fn connection_lost_sets_error_note() {
        let mut app = app_with(Vec::new());
        app.apply_notices(vec![ViewNotice::ConnectionLost {
            reason: "framing error: connection closed".to_string(),
        }]);
        let note = app.status_note.clone().expect("note");
        assert_eq!(note.severity, Severity::Error);
        assert!(note.text.contains("read-only"));
    }

    #[test]
    fn live_entries_follow_tail_in_list_state() {
        let mut app = app_with(vec![message(1, 10)]);
        let notices = app.engine.ingest(call(1, 5));
        app.apply_notices(notices);
        assert_eq!(app.list_state.selected(), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn submit_without_connection_reports_error() {
        let mut app = app_with(vec![message(1, 10)]);
        app.submit(ComposeRequest {
            mode: ComposeMode::Send,
            target: 0,
            text: "hello".to_string(),
        })
        .await;
        assert_eq!(
            app.status_note,
            Some(StatusNote {
                text: "Not connected to socket".to_string(),
                severity: Severity::Error,
            })
        );
    }
}
