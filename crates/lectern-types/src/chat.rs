//! Conversation session and message types for Lectern.
//!
//! A session is a caller-chosen opaque identifier scoping one conversation.
//! It owns an ordered history of messages and moves through a small
//! lifecycle: `Empty -> Active -> Closed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

use crate::llm::Message;

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a caller-chosen token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh time-sortable identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle status of a session.
///
/// `Empty` until the first message is appended, `Active` afterwards, and
/// `Closed` once the caller terminates it. There is no way back from
/// `Closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Empty,
    Active,
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Empty => write!(f, "empty"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(SessionStatus::Empty),
            "active" => Ok(SessionStatus::Active),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(format!("invalid session status: '{other}'")),
        }
    }
}

/// A single message within a conversation history.
///
/// `token_count` is the approximate size computed by the memory's token
/// counter when the message was appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub token_count: u32,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>, token_count: u32) -> Self {
        Self {
            role,
            content: content.into(),
            token_count,
            created_at: Utc::now(),
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(m: &ChatMessage) -> Self {
        Message {
            role: m.role,
            content: m.content.clone(),
        }
    }
}

/// Ordered sequence of messages; insertion order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Sum of the approximate token counts of every message.
    pub fn total_tokens(&self) -> u32 {
        self.messages.iter().map(|m| m.token_count).sum()
    }

    /// Convert to provider messages, dropping chat-specific metadata.
    pub fn to_messages(&self) -> Vec<Message> {
        self.messages.iter().map(Message::from).collect()
    }
}

impl From<Vec<ChatMessage>> for ConversationHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

impl IntoIterator for ConversationHistory {
    type Item = ChatMessage;
    type IntoIter = std::vec::IntoIter<ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
