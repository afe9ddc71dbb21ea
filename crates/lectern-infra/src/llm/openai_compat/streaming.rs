//! Chat completion chunks to [`StreamEvent`]s.

use futures_util::StreamExt;

use async_openai::types::chat::{ChatCompletionResponseStream, FinishReason};

use lectern_core::llm::provider::EventStream;
use lectern_types::llm::{LlmError, StopReason, StreamEvent, Usage};

/// Adapt an async-openai response stream.
///
/// Order: `Connected`, then `TextDelta`s, a `MessageDelta` when a finish
/// reason arrives, `Usage` when the server reports it (the request must
/// set `stream_options.include_usage`), and finally `Done`.
pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> EventStream {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;
        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            if let Some(usage) = chunk.usage.as_ref() {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.as_ref().filter(|t| !t.is_empty()) {
                    yield StreamEvent::TextDelta { text: text.clone() };
                }
                if let Some(reason) = choice.finish_reason.as_ref() {
                    yield StreamEvent::MessageDelta {
                        stop_reason: stop_reason(reason),
                    };
                }
            }
        }

        yield StreamEvent::Done;
    })
}

pub(crate) fn stop_reason(reason: &FinishReason) -> StopReason {
    match reason {
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::Stop
        | FinishReason::ContentFilter
        | FinishReason::ToolCalls
        | FinishReason::FunctionCall => StopReason::EndTurn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_mapping() {
        let cases = [
            (FinishReason::Stop, StopReason::EndTurn),
            (FinishReason::Length, StopReason::MaxTokens),
            (FinishReason::ContentFilter, StopReason::EndTurn),
            (FinishReason::ToolCalls, StopReason::EndTurn),
        ];
        for (finish, expected) in cases {
            assert_eq!(stop_reason(&finish), expected);
        }
    }
}
