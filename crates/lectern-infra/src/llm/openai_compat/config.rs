//! Endpoint presets for OpenAI-compatible backends.
//!
//! Each backend that speaks the chat completions protocol gets a factory
//! returning an [`OpenAiCompatConfig`] with its base URL and capabilities.

use secrecy::SecretString;

use lectern_types::llm::ProviderCapabilities;

/// Ollama's OpenAI-compatible endpoint on its default port.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Ollama ignores the key, but the client always sends one.
const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

/// Configuration for an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable backend name ("ollama", "openai", ...).
    pub provider_name: String,
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// Local Ollama. The context window depends on the pulled model, so the
/// caller supplies it.
pub fn ollama_defaults(model: &str, max_context_tokens: u32) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "ollama".into(),
        base_url: OLLAMA_BASE_URL.into(),
        api_key: SecretString::from(OLLAMA_PLACEHOLDER_KEY),
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            max_context_tokens,
            max_output_tokens: 4_096,
        },
    }
}

/// OpenAI: 128K context, 16K output.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: OPENAI_BASE_URL.into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            max_context_tokens: 128_000,
            max_output_tokens: 16_384,
        },
    }
}

/// Any other server speaking the protocol at `base_url`.
pub fn compatible_defaults(
    base_url: &str,
    api_key: SecretString,
    model: &str,
    max_context_tokens: u32,
) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai_compatible".into(),
        base_url: base_url.into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            max_context_tokens,
            max_output_tokens: 4_096,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_ollama_defaults() {
        let config = ollama_defaults("llama3", 8192);
        assert_eq!(config.provider_name, "ollama");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.api_key.expose_secret(), "ollama");
        assert_eq!(config.capabilities.max_context_tokens, 8192);
    }

    #[test]
    fn test_openai_defaults() {
        let config = openai_defaults(SecretString::from("sk-test"), "gpt-4o");
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.api_key.expose_secret(), "sk-test");
        assert_eq!(config.model, "gpt-4o");
        assert!(config.capabilities.streaming);
        assert_eq!(config.capabilities.max_context_tokens, 128_000);
        assert_eq!(config.capabilities.max_output_tokens, 16_384);
    }

    #[test]
    fn test_compatible_defaults() {
        let config = compatible_defaults(
            "http://gpu-box:8000/v1",
            SecretString::from("k"),
            "mistral",
            32_000,
        );
        assert_eq!(config.provider_name, "openai_compatible");
        assert_eq!(config.base_url, "http://gpu-box:8000/v1");
        assert_eq!(config.capabilities.max_context_tokens, 32_000);
    }
}
