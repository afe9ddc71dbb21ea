//! Provider construction from [`OracleConfig`].

pub mod openai_compat;

use std::sync::Arc;

use secrecy::SecretString;

use lectern_core::llm::box_provider::BoxLlmProvider;
use lectern_core::oracle::{OracleSettings, ProviderOracle};
use lectern_types::config::OracleConfig;
use lectern_types::llm::{CompletionRequest, LlmError, Message, ProviderType};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::{OpenAiCompatConfig, compatible_defaults, ollama_defaults, openai_defaults};

/// Environment variable consulted for OpenAI when `api_key_env` is unset.
pub const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Read the API key named by the config from the environment.
pub fn resolve_api_key(config: &OracleConfig) -> Option<SecretString> {
    let var = match (&config.api_key_env, config.provider) {
        (Some(var), _) => var.as_str(),
        (None, ProviderType::OpenAi) => DEFAULT_OPENAI_KEY_ENV,
        (None, _) => return None,
    };
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Build the provider an [`OracleConfig`] describes.
///
/// OpenAI requires a key; Ollama and other compatible servers fall back to
/// a placeholder when none is given.
pub fn create_provider(
    config: &OracleConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let mut oai_config: OpenAiCompatConfig = match config.provider {
        ProviderType::Ollama => ollama_defaults(&config.model, config.max_context_tokens),
        ProviderType::OpenAi => {
            let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
            openai_defaults(key, &config.model)
        }
        ProviderType::OpenAiCompatible => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                LlmError::InvalidRequest(
                    "oracle.base_url is required for openai_compatible providers".to_string(),
                )
            })?;
            compatible_defaults(
                base_url,
                api_key.unwrap_or_else(|| SecretString::from("none")),
                &config.model,
                config.max_context_tokens,
            )
        }
    };
    if let Some(base_url) = &config.base_url {
        oai_config.base_url = base_url.clone();
    }

    tracing::debug!(
        provider = %oai_config.provider_name,
        base_url = %oai_config.base_url,
        model = %oai_config.model,
        "creating provider"
    );
    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)))
}

/// Provider plus request settings, ready for the control components.
pub fn create_oracle(config: &OracleConfig) -> Result<ProviderOracle, LlmError> {
    let provider = create_provider(config, resolve_api_key(config))?;
    Ok(ProviderOracle::new(
        Arc::new(provider),
        OracleSettings {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        },
    ))
}

/// Send a tiny request to check the endpoint, key and model.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(),
        messages: vec![Message::user("Hello")],
        system: None,
        max_tokens: 10,
        temperature: Some(0.0),
        stream: false,
        stop_sequences: None,
    };
    provider.complete(&request).await?;
    Ok(())
}
