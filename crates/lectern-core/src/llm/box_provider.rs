//! Type erasure for [`LlmProvider`].
//!
//! `LlmProvider` returns `impl Future`, so it cannot be a trait object. The
//! provider is picked from configuration at runtime, which needs one. The
//! private `ErasedProvider` twin boxes the futures, every `LlmProvider`
//! gets it for free, and `BoxLlmProvider` is the handle the rest of the
//! workspace holds.

use futures_util::future::BoxFuture;

use lectern_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, TokenCount,
};

use super::provider::{EventStream, LlmProvider};

trait ErasedProvider: Send + Sync {
    fn name(&self) -> &str;
    fn capabilities(&self) -> &ProviderCapabilities;
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<CompletionResponse, LlmError>>;
    fn stream(&self, request: CompletionRequest) -> EventStream;
    fn count_tokens<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<TokenCount, LlmError>>;
}

impl<P: LlmProvider> ErasedProvider for P {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        LlmProvider::capabilities(self)
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<CompletionResponse, LlmError>> {
        Box::pin(LlmProvider::complete(self, request))
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        LlmProvider::stream(self, request)
    }

    fn count_tokens<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<TokenCount, LlmError>> {
        Box::pin(LlmProvider::count_tokens(self, request))
    }
}

/// A provider chosen at runtime.
pub struct BoxLlmProvider(Box<dyn ErasedProvider>);

impl BoxLlmProvider {
    pub fn new<P: LlmProvider + 'static>(provider: P) -> Self {
        Self(Box::new(provider))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.0.capabilities()
    }

    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        self.0.complete(request).await
    }

    pub fn stream(&self, request: CompletionRequest) -> EventStream {
        self.0.stream(request)
    }

    pub async fn count_tokens(&self, request: &CompletionRequest) -> Result<TokenCount, LlmError> {
        self.0.count_tokens(request).await
    }

    /// Whether a request's estimated input leaves room for its `max_tokens`
    /// within the provider's context window.
    pub async fn fits_context(&self, request: &CompletionRequest) -> Result<bool, LlmError> {
        let input = self.count_tokens(request).await?.input_tokens;
        let window = self.capabilities().max_context_tokens;
        Ok(input.saturating_add(request.max_tokens) <= window)
    }
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxLlmProvider").field(&self.name()).finish()
    }
}
