//! TextOracle: prompt in, text out.
//!
//! Every control component (summarizer, extractor, session runtime) talks
//! to the model through this trait. `ProviderOracle` adapts any
//! `LlmProvider` to it; tests use small scripted implementations.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tracing::{Instrument, info_span};

use lectern_observe::genai_attrs::{GEN_AI_USAGE_INPUT_TOKENS, GEN_AI_USAGE_OUTPUT_TOKENS};
use lectern_types::llm::{CompletionRequest, LlmError, StreamEvent};

use crate::llm::box_provider::BoxLlmProvider;
use crate::prompt::Prompt;

/// Lazy stream of text fragments. Finite and not restartable.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// An opaque, possibly non-deterministic text generator.
pub trait TextOracle: Send + Sync {
    /// Generate the full completion for a prompt.
    fn generate(
        &self,
        prompt: &Prompt,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;

    /// Generate the completion as a stream of fragments.
    fn generate_stream(&self, prompt: Prompt) -> TextStream;
}

impl<O: TextOracle> TextOracle for Arc<O> {
    fn generate(
        &self,
        prompt: &Prompt,
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send {
        (**self).generate(prompt)
    }

    fn generate_stream(&self, prompt: Prompt) -> TextStream {
        (**self).generate_stream(prompt)
    }
}

/// Request parameters applied to every call made through a [`ProviderOracle`].
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

/// Adapts a [`BoxLlmProvider`] to [`TextOracle`].
#[derive(Debug, Clone)]
pub struct ProviderOracle {
    provider: Arc<BoxLlmProvider>,
    settings: OracleSettings,
}

impl ProviderOracle {
    pub fn new(provider: Arc<BoxLlmProvider>, settings: OracleSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &BoxLlmProvider {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn build_request(&self, prompt: &Prompt, stream: bool) -> Result<CompletionRequest, LlmError> {
        let rendered = prompt.render()?;
        Ok(CompletionRequest {
            model: self.settings.model.clone(),
            messages: rendered.messages,
            system: rendered.system,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream,
            stop_sequences: None,
        })
    }
}

impl TextOracle for ProviderOracle {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let request = self.build_request(prompt, false)?;

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = false,
            lectern.prompt = prompt.name(),
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        );

        let response = self
            .provider
            .complete(&request)
            .instrument(span.clone())
            .await?;
        span.record(GEN_AI_USAGE_INPUT_TOKENS, response.usage.input_tokens);
        span.record(GEN_AI_USAGE_OUTPUT_TOKENS, response.usage.output_tokens);
        Ok(response.content)
    }

    fn generate_stream(&self, prompt: Prompt) -> TextStream {
        let request = match self.build_request(&prompt, true) {
            Ok(request) => request,
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.stream = true,
            lectern.prompt = prompt.name(),
        );

        let text = self.provider.stream(request).filter_map(|event| async move {
            match event {
                Ok(StreamEvent::TextDelta { text }) => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        });

        Box::pin(StreamInSpan {
            inner: Box::pin(text),
            span,
        })
    }
}

/// Keeps a span entered while the wrapped stream is polled, so the span
/// covers the whole streaming duration rather than just stream creation.
struct StreamInSpan {
    inner: TextStream,
    span: tracing::Span,
}

impl Stream for StreamInSpan {
    type Item = Result<String, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{EventStream, LlmProvider};
    use crate::prompt::PromptTemplate;
    use futures_util::TryStreamExt;
    use lectern_types::llm::{
        CompletionResponse, Message, ProviderCapabilities, StopReason, TokenCount, Usage,
    };
    use std::sync::Mutex;

    /// Echoes the last user message and records every request it receives.
    struct EchoProvider {
        capabilities: ProviderCapabilities,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                capabilities: ProviderCapabilities {
                    streaming: true,
                    max_context_tokens: 8192,
                    max_output_tokens: 1024,
                },
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    fn last_user(request: &CompletionRequest) -> String {
        request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(CompletionResponse {
                id: "echo-1".to_string(),
                content: last_user(request),
                model: request.model.clone(),
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            })
        }

        fn stream(&self, request: CompletionRequest) -> EventStream {
            let text = last_user(&request);
            let events: Vec<Result<StreamEvent, LlmError>> = vec![
                Ok(StreamEvent::Connected),
                Ok(StreamEvent::TextDelta {
                    text: text[..2].to_string(),
                }),
                Ok(StreamEvent::TextDelta {
                    text: text[2..].to_string(),
                }),
                Ok(StreamEvent::MessageDelta {
                    stop_reason: StopReason::EndTurn,
                }),
                Ok(StreamEvent::Done),
            ];
            Box::pin(futures_util::stream::iter(events))
        }

        async fn count_tokens(&self, _request: &CompletionRequest) -> Result<TokenCount, LlmError> {
            Ok(TokenCount { input_tokens: 0 })
        }
    }

    fn settings() -> OracleSettings {
        OracleSettings {
            model: "test-model".to_string(),
            max_tokens: 256,
            temperature: Some(0.0),
        }
    }

    #[tokio::test]
    async fn test_generate_renders_prompt_into_request() {
        let provider = Arc::new(BoxLlmProvider::new(EchoProvider::new()));
        let oracle = ProviderOracle::new(provider, settings());

        let template = PromptTemplate::new("t", "hello {name}").with_system("sys");
        let prompt = Prompt::new(template)
            .var("name", "world")
            .with_history(vec![Message::user("earlier")]);

        let out = oracle.generate(&prompt).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_generate_missing_variable_never_reaches_provider() {
        let provider = Arc::new(BoxLlmProvider::new(EchoProvider::new()));
        let oracle = ProviderOracle::new(provider, settings());
        let prompt = Prompt::new(PromptTemplate::new("t", "{missing}"));
        let err = oracle.generate(&prompt).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_generate_stream_yields_only_text() {
        let provider = Arc::new(BoxLlmProvider::new(EchoProvider::new()));
        let oracle = ProviderOracle::new(provider, settings());
        let prompt = Prompt::new(PromptTemplate::new("t", "streamed"));

        let parts: Vec<String> = oracle.generate_stream(prompt).try_collect().await.unwrap();
        assert_eq!(parts, vec!["st".to_string(), "reamed".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_stream_render_error_is_single_item() {
        let provider = Arc::new(BoxLlmProvider::new(EchoProvider::new()));
        let oracle = ProviderOracle::new(provider, settings());
        let prompt = Prompt::new(PromptTemplate::new("t", "{missing}"));

        let items: Vec<_> = oracle.generate_stream(prompt).collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
