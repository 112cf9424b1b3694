use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use wacli_core::{Call, Entry, HistorySource, Message};

pub const HISTORY_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// Message and call history written by the bridge process.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Opens the bridge database read-only, or `None` when it has not been
    /// created yet.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Option<Self>, StorageError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(event = "history_db_missing", path = %path.display());
            return Ok(None);
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Some(Self { conn }))
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.schema_version()?;
        if current > HISTORY_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: HISTORY_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_history_schema.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    pub fn insert_message(&self, message: &Message) -> Result<i64, StorageError> {
        self.conn.execute(
            "
            INSERT INTO messages (
                message_id,
                timestamp,
                chat_jid,
                chat_name,
                sender_jid,
                sender_name,
                is_group,
                is_muted,
                is_reply_to_me,
                text
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                message.message_id,
                message.timestamp,
                message.chat_jid,
                message.chat_name,
                message.sender_jid,
                message.sender_name,
                message.is_group,
                message.is_muted,
                message.is_reply_to_me,
                message.text,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_call(&self, call: &Call) -> Result<i64, StorageError> {
        self.conn.execute(
            "
            INSERT INTO calls (
                timestamp,
                call_id,
                caller_jid,
                caller_name,
                is_group,
                group_jid,
                group_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                call.timestamp,
                call.call_id,
                call.caller_jid,
                call.caller_name,
                call.is_group,
                call.group_jid,
                call.group_name,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn messages(&self) -> Result<Vec<Message>, StorageError> {
        let mut statement = self.conn.prepare(
            "
            SELECT id, message_id, timestamp, chat_jid, chat_name, sender_jid, sender_name,
                   is_group, is_muted, is_reply_to_me, text
            FROM messages
            ORDER BY id ASC
            ",
        )?;

        let rows = statement.query_map([], |row| {
            Ok(Message {
                id: row.get(0)?,
                message_id: row.get(1)?,
                timestamp: row.get(2)?,
                chat_jid: row.get(3)?,
                chat_name: row.get(4)?,
                sender_jid: row.get(5)?,
                sender_name: row.get(6)?,
                is_group: row.get(7)?,
                is_muted: row.get(8)?,
                is_reply_to_me: row.get(9)?,
                text: row.get(10)?,
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn calls(&self) -> Result<Vec<Call>, StorageError> {
        let mut statement = self.conn.prepare(
            "
            SELECT id, timestamp, call_id, caller_jid, caller_name, is_group, group_jid, group_name
            FROM calls
            ORDER BY id ASC
            ",
        )?;

        let rows = statement.query_map([], |row| {
            Ok(Call {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                call_id: row.get(2)?,
                caller_jid: row.get(3)?,
                caller_name: row.get(4)?,
                is_group: row.get(5)?,
                group_jid: row.get(6)?,
                group_name: row.get(7)?,
            })
        })?;

        let mut calls = Vec::new();
        for row in rows {
            calls.push(row?);
        }
        Ok(calls)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl HistorySource for HistoryStore {
    type Error = StorageError;

    /// Messages followed by calls, each in insertion order.
    fn load_history(&self) -> Result<Vec<Entry>, StorageError> {
        let messages = self.messages()?;
        let calls = self.calls()?;
        debug!(
            event = "history_loaded",
            messages = messages.len(),
            calls = calls.len()
        );
        let mut entries = Vec::with_capacity(messages.len() + calls.len());
        entries.extend(messages.into_iter().map(Entry::Message));
        entries.extend(calls.into_iter().map(Entry::Call));
        Ok(entries)
    }
}
