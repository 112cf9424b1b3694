use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockRecord {
    pub pid: u32,
    #[serde(default)]
    pub window_id: String,
}

/// Removes the lock file when the client exits.
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub fn acquire(path: &Path) -> io::Result<Self> {
        let record = LockRecord {
            pid: std::process::id(),
            window_id: std::env::var("WINDOWID").unwrap_or_default(),
        };
        write_lock(path, &record)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn write_lock(path: &Path, record: &LockRecord) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string(record)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
    fs::write(path, body)
}

/// Reads the lock file and returns the record of a still-running instance.
///
/// Stale or unreadable lock files are deleted.
pub fn live_instance(path: &Path, is_running: impl Fn(u32) -> bool) -> Option<LockRecord> {
    let raw = fs::read_to_string(path).ok()?;
    let record = match serde_json::from_str::<LockRecord>(&raw) {
        Ok(record) if record.pid != 0 && !record.window_id.trim().is_empty() => record,
        Ok(_) => return None,
        Err(err) => {
            warn!(event = "lock_file_corrupt", path = %path.display(), error = %err);
            let _ = fs::remove_file(path);
            return None;
        }
    };
    if !is_running(record.pid) {
        info!(event = "lock_file_stale", pid = record.pid);
        let _ = fs::remove_file(path);
        return None;
    }
    Some(record)
}

pub fn process_running(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// Focuses an already running client window, if there is one.
pub fn focus_existing_instance(lock_path: &Path) -> bool {
    let Some(record) = live_instance(lock_path, process_running) else {
        return false;
    };
    let status = Command::new("i3-msg")
        .arg(format!("[id={}] focus", record.window_id))
        .output();
    match status {
        Ok(output) if output.status.success() => {
            info!(event = "focused_existing_instance", pid = record.pid);
            true
        }
        Ok(output) => {
            warn!(event = "focus_failed", status = %output.status);
            let _ = fs::remove_file(lock_path);
            false
        }
        Err(err) => {
            warn!(event = "focus_failed", error = %err);
            let _ = fs::remove_file(lock_path);
            false
        }
    }
}
