//! Oracle backend abstractions.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `TokenCounter`: approximate token counting

pub mod box_provider;
pub mod provider;
pub mod token_counter;
