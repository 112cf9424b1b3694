use clap::Parser;
use std::path::PathBuf;
use wacli_sync::EngineConfig;

const DEFAULT_RUNTIME_DIR: &str = "/tmp/rlocal/wacli";
const DEFAULT_DB_PATH: &str = "cli/messages.db";

#[derive(Parser, Debug, Default)]
#[command(name = "wacli-tui", about = "Terminal client for the wacli message bridge")]
pub struct Args {
    /// Directory holding the socket, log and lock files.
    #[arg(long, default_value = "")]
    pub runtime_dir: String,
    #[arg(long, default_value = "")]
    pub socket: String,
    /// SQLite database written by the bridge.
    #[arg(long, default_value = "")]
    pub db: String,
    #[arg(long, default_value = "")]
    pub log_file: String,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub runtime_dir: PathBuf,
    pub socket_path: PathBuf,
    pub db_path: PathBuf,
    pub log_file: PathBuf,
    pub lock_file: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.socket_path.clone())
    }
}

pub fn load_config(args: &Args) -> Config {
    let runtime_dir = resolve_path(
        &args.runtime_dir,
        env_value("WACLI_RUNTIME_DIR"),
        || PathBuf::from(DEFAULT_RUNTIME_DIR),
    );
    let socket_path = resolve_path(&args.socket, env_value("WACLI_SOCK"), || {
        runtime_dir.join("wacli.sock")
    });
    let db_path = resolve_path(&args.db, env_value("WACLI_DB"), || {
        PathBuf::from(DEFAULT_DB_PATH)
    });
    let log_file = resolve_path(&args.log_file, env_value("WACLI_LOG_FILE"), || {
        runtime_dir.join("wacli.log")
    });
    let lock_file = runtime_dir.join("tui.json");
    let log_level = resolve_log_level(args.debug, env_value("WACLI_LOG_LEVEL"));
    Config {
        runtime_dir,
        socket_path,
        db_path,
        log_file,
        lock_file,
        log_level,
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Flag first, then environment, then the default; blank values count as unset.
fn resolve_path(
    flag: &str,
    env: Option<String>,
    default: impl FnOnce() -> PathBuf,
) -> PathBuf {
    if !flag.trim().is_empty() {
        return PathBuf::from(flag);
    }
    if let Some(value) = env {
        if !value.trim().is_empty() {
            return PathBuf::from(value);
        }
    }
    default()
}

fn resolve_log_level(debug: bool, env: Option<String>) -> String {
    if debug {
        return "debug".to_string();
    }
    match env {
        Some(level) if !level.trim().is_empty() => level,
        _ => "info".to_string(),
    }
}
