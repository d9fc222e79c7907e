//! Chat and message types for Confab.
//!
//! These types model conversations between a user and an assistant:
//! the chat record itself, its ordered messages, and the deferred
//! property edits that are flushed in a batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            other => Err(format!("invalid sender: '{other}'")),
        }
    }
}

/// A chat between the user and an assistant.
///
/// Owns an ordered sequence of [`ChatMessage`]s (held by the store and
/// mirrored in the live list binding). Deleting a chat deletes its
/// messages and invalidates any in-flight reply handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Whether replies for this chat are streamed incrementally.
    pub streaming_enabled: bool,
    pub message_count: u32,
    /// Completion model used for this chat.
    pub model: String,
}

/// A single message within a chat.
///
/// Messages are ordered by `position` (dense, append-order). An assistant
/// message's `text` is mutated incrementally while its stream is active and
/// becomes immutable once the stream completes; metadata fields are filled
/// in at completion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender: Sender,
    pub text: String,
    /// Append-order index within the chat, starting at 0.
    pub position: u32,
    pub created_at: DateTime<Utc>,
    /// Model that produced this message (assistant messages only).
    pub model: Option<String>,
    /// Round-trip latency in milliseconds (assistant messages only).
    pub response_ms: Option<u64>,
}

/// A deferred property edit, applied on `submit_changes`.
///
/// Mirrors the source system's pending-edit model: toggling streaming or
/// renaming a chat stages an edit; nothing changes until the batch flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEdit {
    StreamingEnabled { chat_id: Uuid, enabled: bool },
    Title { chat_id: Uuid, title: String },
}

impl ChatEdit {
    /// The chat this edit targets.
    pub fn chat_id(&self) -> Uuid {
        match self {
            ChatEdit::StreamingEnabled { chat_id, .. } => *chat_id,
            ChatEdit::Title { chat_id, .. } => *chat_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_roundtrip() {
        for sender in [Sender::User, Sender::Assistant] {
            let s = sender.to_string();
            let parsed: Sender = s.parse().unwrap();
            assert_eq!(sender, parsed);
        }
    }

    #[test]
    fn test_sender_serde() {
        let json = serde_json::to_string(&Sender::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: Sender = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Sender::Assistant);
    }

    #[test]
    fn test_sender_rejects_unknown() {
        assert!("robot".parse::<Sender>().is_err());
    }

    #[test]
    fn test_chat_serialize() {
        let chat = Chat {
            id: Uuid::now_v7(),
            title: Some("Weekend plans".to_string()),
            created_at: Utc::now(),
            streaming_enabled: true,
            message_count: 4,
            model: "gpt-4o-mini".to_string(),
        };
        let json = serde_json::to_string(&chat).unwrap();
        assert!(json.contains("\"streaming_enabled\":true"));
    }

    #[test]
    fn test_chat_edit_chat_id() {
        let id = Uuid::now_v7();
        let edit = ChatEdit::StreamingEnabled {
            chat_id: id,
            enabled: false,
        };
        assert_eq!(edit.chat_id(), id);

        let edit = ChatEdit::Title {
            chat_id: id,
            title: "Renamed".to_string(),
        };
        assert_eq!(edit.chat_id(), id);
    }

    #[test]
    fn test_chat_edit_serde_tagged() {
        let edit = ChatEdit::StreamingEnabled {
            chat_id: Uuid::now_v7(),
            enabled: true,
        };
        let json = serde_json::to_string(&edit).unwrap();
        assert!(json.contains("\"kind\":\"streaming_enabled\""));
    }
}
