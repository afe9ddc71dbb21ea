//! LlmProvider trait definition.
//!
//! The backend seam every chat-completion provider implements. Uses RPITIT
//! for `complete` and `count_tokens`, and `Pin<Box<dyn Stream>>` for
//! `stream` so the trait can be erased by `BoxLlmProvider`.

use std::pin::Pin;

use futures_util::Stream;

use lectern_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent, TokenCount,
};

/// Boxed stream of provider events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for chat-completion backends (Ollama, OpenAI, any compatible server).
///
/// Implementations live in lectern-infra (e.g., `OpenAiCompatibleProvider`).
/// Core code never talks to a provider directly; it goes through
/// [`crate::oracle::ProviderOracle`].
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. The returned stream owns
    /// everything it needs and outlives `&self`.
    fn stream(&self, request: CompletionRequest) -> EventStream;

    /// Estimate the tokens in a request without sending it.
    fn count_tokens(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<TokenCount, LlmError>> + Send;
}
