//! Approximate token counting.
//!
//! Token counting is a capability of its own so memory trimming and the
//! reduce budget do not depend on which oracle is configured.

use lectern_types::llm::Message;

/// Approximates how many tokens a text occupies.
pub trait TokenCounter: Send + Sync {
    fn estimate_tokens(&self, text: &str) -> u32;

    /// Sum over several messages' contents.
    fn estimate_messages(&self, messages: &[Message]) -> u32 {
        messages
            .iter()
            .map(|m| self.estimate_tokens(&m.content))
            .sum()
    }
}

/// Character-ratio heuristic: one token per `chars_per_token` characters,
/// rounded up.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioCounter {
    chars_per_token: u32,
}

impl CharRatioCounter {
    /// A zero ratio is treated as one.
    pub fn new(chars_per_token: u32) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioCounter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for CharRatioCounter {
    fn estimate_tokens(&self, text: &str) -> u32 {
        let chars = text.chars().count() as u64;
        chars.div_ceil(self.chars_per_token as u64) as u32
    }
}
