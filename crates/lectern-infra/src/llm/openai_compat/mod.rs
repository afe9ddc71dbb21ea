//! OpenAI-compatible provider.
//!
//! One [`OpenAiCompatibleProvider`] serves Ollama's `/v1` endpoint, OpenAI
//! and any other server speaking the chat completions protocol, selected by
//! base URL through the factories in [`config`].

pub mod config;
mod error;
pub mod streaming;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest, StopConfiguration,
};
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use lectern_core::llm::provider::{EventStream, LlmProvider};
use lectern_core::llm::token_counter::{CharRatioCounter, TokenCounter};
use lectern_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, ProviderCapabilities,
    StopReason, TokenCount, Usage,
};

use self::config::OpenAiCompatConfig;
use self::error::map_openai_error;
use self::streaming::{map_openai_stream, stop_reason};

/// Tokens added per message for role markers in the chat template.
const MESSAGE_FRAMING_TOKENS: u32 = 3;

/// Provider for any OpenAI-compatible API.
///
/// Not `Debug`: the async-openai client holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
    capabilities: ProviderCapabilities,
    counter: CharRatioCounter,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
            capabilities: config.capabilities,
            counter: CharRatioCounter::default(),
        }
    }

    /// Local Ollama at `http://localhost:11434/v1`.
    pub fn ollama(model: &str, max_context_tokens: u32) -> Self {
        Self::new(config::ollama_defaults(model, max_context_tokens))
    }

    pub fn openai(api_key: SecretString, model: &str) -> Self {
        Self::new(config::openai_defaults(api_key, model))
    }

    fn build_request(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(system_message(system));
        }
        messages.extend(request.messages.iter().map(to_openai_message));

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if let Some(stops) = request.stop_sequences.as_ref().filter(|s| !s.is_empty()) {
            req.stop = Some(StopConfiguration::StringArray(stops.clone()));
        }

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }

        Ok(req)
    }
}

fn system_message(content: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content.to_string()),
        name: None,
    })
}

fn to_openai_message(msg: &Message) -> ChatCompletionRequestMessage {
    match msg.role {
        MessageRole::System => system_message(&msg.content),
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
            name: None,
        }),
        MessageRole::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.content.clone(),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request, false)?;

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let first = response.choices.first();
        let content = first
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let stop_reason = first
            .and_then(|c| c.finish_reason.as_ref())
            .map(stop_reason)
            .unwrap_or(StopReason::EndTurn);
        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let oai_request = match self.build_request(&request, true) {
            Ok(req) => req,
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };

        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);
            while let Some(event) = inner.next().await {
                yield event?;
            }
        })
    }

    /// Local estimate; these servers have no token counting endpoint.
    async fn count_tokens(&self, request: &CompletionRequest) -> Result<TokenCount, LlmError> {
        let system = request
            .system
            .as_deref()
            .map_or(0, |s| self.counter.estimate_tokens(s));
        let messages: u32 = request
            .messages
            .iter()
            .map(|m| self.counter.estimate_tokens(&m.content) + MESSAGE_FRAMING_TOKENS)
            .sum();
        Ok(TokenCount {
            input_tokens: system + messages,
        })
    }
}
