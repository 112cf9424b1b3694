use crate::entry::Entry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;

/// Inbound frames carry exactly one log entry.
pub type InboundFrame = Entry;

/// Outbound command written by the client, one per line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Send {
        chat_jid: String,
        text: String,
    },
    Reply {
        chat_jid: String,
        message_id: String,
        sender_jid: String,
        text: String,
    },
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Command::Send { .. } => "send",
            Command::Reply { .. } => "reply",
        }
    }

    pub fn chat_jid(&self) -> &str {
        match self {
            Command::Send { chat_jid, .. } | Command::Reply { chat_jid, .. } => chat_jid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame exceeds max size: {size} > {max}")]
    OversizedFrame { size: usize, max: usize },
    #[error("frame encode failed: {0}")]
    Encode(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
}

pub fn encode_frame<T: Serialize>(
    value: &T,
    max_frame_bytes: usize,
) -> Result<Vec<u8>, FrameError> {
    let mut encoded =
        serde_json::to_vec(value).map_err(|err| FrameError::Encode(err.to_string()))?;
    if encoded.len() > max_frame_bytes {
        return Err(FrameError::OversizedFrame {
            size: encoded.len(),
            max: max_frame_bytes,
        });
    }
    encoded.push(b'\n');
    Ok(encoded)
}

pub fn decode_frame<T: DeserializeOwned>(
    bytes: &[u8],
    max_frame_bytes: usize,
) -> Result<T, FrameError> {
    let raw = trim_line_ending(bytes);
    if raw.len() > max_frame_bytes {
        return Err(FrameError::OversizedFrame {
            size: raw.len(),
            max: max_frame_bytes,
        });
    }
    serde_json::from_slice(raw).map_err(|err| FrameError::Decode(err.to_string()))
}

pub fn encode_command(command: &Command, max_frame_bytes: usize) -> Result<Vec<u8>, FrameError> {
    encode_frame(command, max_frame_bytes)
}

pub fn decode_inbound(bytes: &[u8], max_frame_bytes: usize) -> Result<InboundFrame, FrameError> {
    decode_frame(bytes, max_frame_bytes)
}

/// True for lines that carry no frame at all (blank keep-alive newlines).
pub fn is_blank_line(bytes: &[u8]) -> bool {
    bytes.iter().all(|byte| byte.is_ascii_whitespace())
}

fn trim_line_ending(bytes: &[u8]) -> &[u8] {
    let mut raw = bytes;
    if raw.ends_with(b"\n") {
        raw = &raw[..raw.len() - 1];
    }
    if raw.ends_with(b"\r") {
        raw = &raw[..raw.len() - 1];
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Call, Message};

    fn message_entry(timestamp: i64, text: &str) -> Entry {
        Entry::Message(Message {
            id: 0,
            message_id: format!("mid-{timestamp}"),
            timestamp,
            chat_jid: "team@g.us".to_string(),
            chat_name: "Team".to_string(),
            sender_jid: "1234@s.whatsapp.net".to_string(),
            sender_name: "Alice".to_string(),
            is_group: true,
            is_muted: false,
            is_reply_to_me: false,
            text: text.to_string(),
        })
    }

    fn call_entry(timestamp: i64) -> Entry {
        Entry::Call(Call {
            id: 0,
            timestamp,
            call_id: "call-9".to_string(),
            caller_jid: "5678@s.whatsapp.net".to_string(),
            caller_name: "Bob".to_string(),
            is_group: false,
            group_jid: String::new(),
            group_name: String::new(),
        })
    }

    #[test]
    fn commands_round_trip_through_frames() {
        let send = Command::Send {
            chat_jid: "1234@s.whatsapp.net".to_string(),
            text: "on my way".to_string(),
        };
        let reply = Command::Reply {
            chat_jid: "team@g.us".to_string(),
            message_id: "3EB0C767D26A".to_string(),
            sender_jid: "1234@s.whatsapp.net".to_string(),
            text: "sounds good\nsee you".to_string(),
        };

        for command in [send, reply] {
            let frame = encode_command(&command, DEFAULT_MAX_FRAME_BYTES).expect("encode");
            assert_eq!(frame.last(), Some(&b'\n'));
            assert_eq!(frame.iter().filter(|byte| **byte == b'\n').count(), 1);
            let decoded: Command = decode_frame(&frame, DEFAULT_MAX_FRAME_BYTES).expect("decode");
            assert_eq!(decoded, command);
        }
    }

    #[test]
    fn send_command_uses_flat_action_shape() {
        let frame = encode_command(
            &Command::Send {
                chat_jid: "c@s.whatsapp.net".to_string(),
                text: "hi".to_string(),
            },
            DEFAULT_MAX_FRAME_BYTES,
        )
        .expect("encode");
        let value: serde_json::Value =
            serde_json::from_slice(&frame[..frame.len() - 1]).expect("json");
        assert_eq!(
            value,
            serde_json::json!({"action": "send", "chat_jid": "c@s.whatsapp.net", "text": "hi"})
        );
    }

    #[test]
    fn inbound_decode_accepts_crlf_and_rejects_unknown_type() {
        let mut frame =
            encode_frame(&call_entry(5), DEFAULT_MAX_FRAME_BYTES).expect("encode call");
        frame.pop();
        frame.extend_from_slice(b"\r\n");
        assert_eq!(
            decode_inbound(&frame, DEFAULT_MAX_FRAME_BYTES).expect("decode call"),
            call_entry(5)
        );

        let unknown = br#"{"type":"presence","data":{}}"#;
        assert!(matches!(
            decode_inbound(unknown, DEFAULT_MAX_FRAME_BYTES),
            Err(FrameError::Decode(_))
        ));
    }

    #[test]
    fn oversized_frames_are_rejected_both_ways() {
        let entry = message_entry(1, &"x".repeat(256));
        assert!(matches!(
            encode_frame(&entry, 64),
            Err(FrameError::OversizedFrame { .. })
        ));

        let frame = encode_frame(&entry, DEFAULT_MAX_FRAME_BYTES).expect("encode");
        assert!(matches!(
            decode_inbound(&frame, 64),
            Err(FrameError::OversizedFrame { max: 64, .. })
        ));
    }
}
