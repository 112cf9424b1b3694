mod config;
mod instance;
mod state;
mod theme;
mod ui;

use clap::Parser;
use config::{load_config, Args, Config};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use instance::{focus_existing_instance, LockGuard};
use ratatui::{backend::CrosstermBackend, Terminal};
use state::{Action, App};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::Arc,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};
use wacli_storage::HistoryStore;
use wacli_sync::{SyncEngine, SyncEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = load_config(&args);
    create_runtime_dir(&config.runtime_dir)?;
    init_logging(&config);
    info!(
        event = "startup",
        socket = %config.socket_path.display(),
        db = %config.db_path.display()
    );

    if focus_existing_instance(&config.lock_file) {
        return Ok(());
    }
    let _lock = match LockGuard::acquire(&config.lock_file) {
        Ok(guard) => Some(guard),
        Err(err) => {
            warn!(event = "lock_file_error", error = %err);
            None
        }
    };

    let mut app = App::new(SyncEngine::new(config.engine_config()));
    load_history(&mut app, &config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut events = EventStream::new();

    terminal.draw(|frame| ui::render(frame, &mut app))?;
    let mut sync_rx = match app.engine.connect().await {
        Ok(rx) => Some(rx),
        Err(err) => {
            app.set_error(format!("{err} (read-only)"));
            None
        }
    };

    let result = run(&mut terminal, &mut app, &mut events, &mut sync_rx).await;

    app.engine.disconnect().await;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!(event = "shutdown");
    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventStream,
    sync_rx: &mut Option<mpsc::Receiver<SyncEvent>>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        let mut sync_closed = false;
        tokio::select! {
            event = next_sync_event(sync_rx) => match event {
                Some(event) => {
                    let notices = app.engine.handle_event(event);
                    app.apply_notices(notices);
                }
                None => sync_closed = true,
            },
            maybe_event = events.next() => {
                if let Some(Ok(event)) = maybe_event {
                    match handle_input(event, app) {
                        Some(Action::Quit) => return Ok(()),
                        Some(Action::Submit(request)) => app.submit(request).await,
                        Some(Action::Copy(text)) => copy_to_clipboard(app, text),
                        None => {}
                    }
                }
            }
        }
        if sync_closed {
            *sync_rx = None;
        }
    }
}

async fn next_sync_event(rx: &mut Option<mpsc::Receiver<SyncEvent>>) -> Option<SyncEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn handle_input(event: Event, app: &mut App) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
        _ => None,
    }
}

fn load_history(app: &mut App, config: &Config) {
    let store = match HistoryStore::open_existing(&config.db_path) {
        Ok(store) => store,
        Err(err) => {
            warn!(event = "history_open_failed", error = %err);
            app.set_error(format!("history unavailable: {err}"));
            None
        }
    };
    match app.engine.load_history(&store) {
        Ok(notices) => app.apply_notices(notices),
        Err(err) => {
            warn!(event = "history_load_failed", error = %err);
            app.set_error(format!("history unavailable: {err}"));
        }
    }
}

fn copy_to_clipboard(app: &mut App, text: String) {
    use arboard::Clipboard;
    let copied = Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text));
    match copied {
        Ok(()) => app.set_info("Copied to clipboard"),
        Err(err) => {
            warn!(event = "clipboard_failed", error = %err);
            app.set_error(format!("clipboard unavailable: {err}"));
        }
    }
}

fn create_runtime_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(path)
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let writer = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
    {
        Ok(file) => BoxMakeWriter::new(Arc::new(file)),
        Err(_) => BoxMakeWriter::new(io::sink),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}
