use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chat message as recorded by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub message_id: String,
    pub timestamp: i64,
    pub chat_jid: String,
    pub chat_name: String,
    pub sender_jid: String,
    pub sender_name: String,
    pub is_group: bool,
    pub is_muted: bool,
    pub is_reply_to_me: bool,
    pub text: String,
}

/// An incoming call notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Call {
    #[serde(default)]
    pub id: i64,
    pub timestamp: i64,
    pub call_id: String,
    pub caller_jid: String,
    pub caller_name: String,
    pub is_group: bool,
    pub group_jid: String,
    pub group_name: String,
}

/// One row of the chat log.
///
/// The serde shape is the inbound wire frame: `{"type": "message"|"call", "data": {...}}`.
/// Any other `type` fails to deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Entry {
    Message(Message),
    Call(Call),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Message,
    Call,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Message => "message",
            EntryKind::Call => "call",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn title(&self) -> String {
        if self.is_reply_to_me {
            format!("↩ {}", self.sender_name)
        } else {
            self.sender_name.clone()
        }
    }

    /// Body with embedded newlines flattened, for single-line rows.
    pub fn text_oneline(&self) -> String {
        self.text.replace(['\r', '\n'], " ")
    }
}

impl Call {
    pub fn title(&self) -> String {
        if self.is_group && !self.group_name.is_empty() {
            format!("{} @ {}", self.caller_name, self.group_name)
        } else {
            self.caller_name.clone()
        }
    }
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Message(_) => EntryKind::Message,
            Entry::Call(_) => EntryKind::Call,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Entry::Message(message) => message.timestamp,
            Entry::Call(call) => call.timestamp,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Entry::Message(message) => message.title(),
            Entry::Call(call) => call.title(),
        }
    }

    /// The message behind this entry, if it can be the target of a send or reply.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Entry::Message(message) => Some(message),
            Entry::Call(_) => None,
        }
    }

    pub fn formatted_time(&self) -> String {
        self.formatted_time_in(&Local)
    }

    pub fn formatted_time_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        match tz.timestamp_opt(self.timestamp(), 0).single() {
            Some(dt) => format_clock(dt),
            None => "--:--".to_string(),
        }
    }
}

fn format_clock<Tz: TimeZone>(dt: DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    dt.format("%H:%M").to_string()
}
