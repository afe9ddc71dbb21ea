//! async-openai errors mapped onto [`LlmError`].

use async_openai::error::{ApiError, OpenAIError};

use lectern_types::llm::LlmError;

pub(super) fn map_openai_error(err: OpenAIError) -> LlmError {
    match &err {
        OpenAIError::ApiError(api) => map_api_error(api),
        OpenAIError::Reqwest(e) => match e.status().map(|s| s.as_u16()) {
            Some(401 | 403) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            Some(503 | 529) => LlmError::Overloaded(err.to_string()),
            _ if e.is_timeout() => LlmError::Provider {
                message: format!("request timed out: {e}"),
            },
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(e) => LlmError::Stream(e.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

fn map_api_error(api: &ApiError) -> LlmError {
    let code = api.code.as_deref().unwrap_or_default();
    let kind = api.r#type.as_deref().unwrap_or_default();
    let message = api.message.as_str();
    let lower = message.to_lowercase();

    match (code, kind) {
        (_, "authentication_error") | ("invalid_api_key", _) => LlmError::AuthenticationFailed,
        _ if lower.contains("incorrect api key") || lower.contains("invalid api key") => {
            LlmError::AuthenticationFailed
        }
        ("rate_limit_exceeded", _) | (_, "rate_limit_error") => LlmError::RateLimited {
            retry_after_ms: None,
        },
        ("context_length_exceeded", _) => context_exceeded(message),
        _ if lower.contains("maximum context length") => context_exceeded(message),
        ("server_error", _) | (_, "overloaded_error") => LlmError::Overloaded(message.to_string()),
        // Ollama answers 404 for models that were never pulled.
        _ if lower.contains("model") && lower.contains("not found") => {
            LlmError::InvalidRequest(message.to_string())
        }
        _ => LlmError::Provider {
            message: message.to_string(),
        },
    }
}

/// OpenAI phrases this as "maximum context length is 8192 tokens. However,
/// you requested 9000 tokens"; the first two numbers are taken in that
/// order, zero when absent.
fn context_exceeded(message: &str) -> LlmError {
    let mut numbers = message
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|s| s.parse::<u32>().ok());
    LlmError::ContextLengthExceeded {
        max: numbers.next().unwrap_or(0),
        requested: numbers.next().unwrap_or(0),
    }
}
