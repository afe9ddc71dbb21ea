//! "Last" trimming strategy for conversation histories.

use lectern_types::chat::{ChatMessage, MessageRole};
use lectern_types::config::MemoryConfig;

/// Keeps the most recent messages that fit a token budget.
///
/// Counts come from each message's stored `token_count`. A leading system
/// message is pinned when `include_system` is set; it counts against the
/// budget, but if it alone exceeds the budget the result is exactly that
/// message. After dropping the oldest messages, the window is advanced
/// until it starts on `start_on` (system messages are always a valid start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    pub max_tokens: u32,
    pub include_system: bool,
    pub start_on: Option<MessageRole>,
}

impl TrimPolicy {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            include_system: true,
            start_on: Some(MessageRole::User),
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            include_system: config.include_system,
            start_on: config.start_on,
        }
    }

    pub fn trim(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let (pinned, rest) = match messages.split_first() {
            Some((first, rest)) if self.include_system && first.role == MessageRole::System => {
                (Some(first), rest)
            }
            _ => (None, messages),
        };

        let pinned_tokens = pinned.map_or(0, |m| m.token_count);
        if pinned_tokens > self.max_tokens {
            return pinned.into_iter().cloned().collect();
        }
        let budget = self.max_tokens - pinned_tokens;

        // Longest suffix of `rest` within the remaining budget.
        let mut used = 0u32;
        let mut keep_from = rest.len();
        for (i, message) in rest.iter().enumerate().rev() {
            match used.checked_add(message.token_count) {
                Some(total) if total <= budget => {
                    used = total;
                    keep_from = i;
                }
                _ => break,
            }
        }

        let mut window = &rest[keep_from..];
        if let Some(role) = self.start_on {
            let start = window
                .iter()
                .position(|m| m.role == role || m.role == MessageRole::System)
                .unwrap_or(window.len());
            window = &window[start..];
        }

        pinned.into_iter().chain(window).cloned().collect()
    }
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}
