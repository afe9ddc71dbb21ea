//! Conversational turns over a shared [`ConversationMemory`](crate::memory::ConversationMemory).

mod runtime;

pub use runtime::{SessionRuntime, SessionStream};
