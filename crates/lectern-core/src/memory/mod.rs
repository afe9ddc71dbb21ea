//! Conversation memory: per-session histories and budget trimming.

pub mod store;
pub mod trim;

pub use store::{ConversationMemory, SessionSlot};
pub use trim::TrimPolicy;
