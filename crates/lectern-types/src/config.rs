//! Configuration types for Lectern.
//!
//! `LecternConfig` represents the top-level `config.toml`. Every field has a
//! default so an empty (or missing) file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::llm::{MessageRole, ProviderType};

/// Sentinel the sequential fold starts from.
pub const DEFAULT_INITIAL_SUMMARY: &str = "No summary yet.";

/// Top-level configuration.
///
/// Loaded from `~/.lectern/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LecternConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl LecternConfig {
    /// Check the invariants the control logic relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate("chunking")?;
        check_split("summarize", self.summarize.chunk_size, self.summarize.chunk_overlap)?;
        check_split("keywords", self.keywords.chunk_size, 0)?;

        if self.memory.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "memory.max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.extraction.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "extraction.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.summarize.map_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "summarize.map_concurrency must be at least 1".to_string(),
            ));
        }
        if self.summarize.reduce_token_budget == 0 {
            return Err(ConfigError::Invalid(
                "summarize.reduce_token_budget must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.k must be at least 1".to_string(),
            ));
        }
        if self.oracle.model.trim().is_empty() {
            return Err(ConfigError::Invalid("oracle.model must not be empty".to_string()));
        }
        Ok(())
    }
}

fn check_split(section: &str, size: usize, overlap: usize) -> Result<(), ConfigError> {
    if size == 0 {
        return Err(ConfigError::Invalid(format!(
            "{section}.chunk_size must be greater than 0"
        )));
    }
    if overlap >= size {
        return Err(ConfigError::Invalid(format!(
            "{section}.chunk_overlap ({overlap}) must be smaller than chunk_size ({size})"
        )));
    }
    Ok(())
}

/// Which backend to talk to and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub provider: ProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    /// Overrides the provider's default endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Name of the environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_context_tokens() -> u32 {
    8192
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::default(),
            model: default_model(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            api_key_env: None,
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

/// Chunking used for retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        check_split(section, self.chunk_size, self.chunk_overlap)
    }
}

/// Conversation memory trimming policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Token budget for the trimmed history, pinned system message included.
    #[serde(default = "default_history_tokens")]
    pub max_tokens: u32,
    /// Pin a leading system message regardless of budget.
    #[serde(default = "default_true")]
    pub include_system: bool,
    /// Role the trimmed window must start on. `None` disables the rule.
    #[serde(default = "default_start_on")]
    pub start_on: Option<MessageRole>,
    /// Write the trimmed view back to storage.
    #[serde(default)]
    pub commit_trimmed: bool,
}

fn default_history_tokens() -> u32 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_start_on() -> Option<MessageRole> {
    Some(MessageRole::User)
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_history_tokens(),
            include_system: true,
            start_on: default_start_on(),
            commit_trimmed: false,
        }
    }
}

/// Summarization strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStrategy {
    /// One oracle call per chunk, each folding into the running summary.
    Sequential,
    /// Independent per-chunk summaries reduced into one.
    #[default]
    MapReduce,
}

impl fmt::Display for SummaryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryStrategy::Sequential => write!(f, "sequential"),
            SummaryStrategy::MapReduce => write!(f, "map_reduce"),
        }
    }
}

impl FromStr for SummaryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sequential" | "fold" => Ok(SummaryStrategy::Sequential),
            "map_reduce" => Ok(SummaryStrategy::MapReduce),
            other => Err(format!("invalid summary strategy: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeConfig {
    #[serde(default)]
    pub strategy: SummaryStrategy,
    #[serde(default = "default_summary_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub chunk_overlap: usize,
    /// Maximum number of map calls in flight.
    #[serde(default = "default_map_concurrency")]
    pub map_concurrency: usize,
    /// Largest joined input a single reduce call may receive.
    #[serde(default = "default_reduce_token_budget")]
    pub reduce_token_budget: u32,
    #[serde(default = "default_initial_summary")]
    pub initial_summary: String,
}

fn default_summary_chunk_size() -> usize {
    6000
}

fn default_map_concurrency() -> usize {
    4
}

fn default_reduce_token_budget() -> u32 {
    3000
}

fn default_initial_summary() -> String {
    DEFAULT_INITIAL_SUMMARY.to_string()
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            strategy: SummaryStrategy::default(),
            chunk_size: default_summary_chunk_size(),
            chunk_overlap: 0,
            map_concurrency: default_map_concurrency(),
            reduce_token_budget: default_reduce_token_budget(),
            initial_summary: default_initial_summary(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Chunk size for per-chunk keyword extraction.
    #[serde(default = "default_keywords_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_keywords_per_chunk")]
    pub per_chunk: usize,
    #[serde(default = "default_gist_keywords")]
    pub gist: usize,
}

fn default_keywords_chunk_size() -> usize {
    2500
}

fn default_keywords_per_chunk() -> usize {
    5
}

fn default_gist_keywords() -> usize {
    30
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_keywords_chunk_size(),
            per_chunk: default_keywords_per_chunk(),
            gist: default_gist_keywords(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages retrieved per question.
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = LecternConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.memory.max_tokens, 1000);
        assert!(config.memory.include_system);
        assert_eq!(config.memory.start_on, Some(MessageRole::User));
        assert_eq!(config.summarize.strategy, SummaryStrategy::MapReduce);
        assert_eq!(config.summarize.chunk_size, 6000);
        assert_eq!(config.summarize.initial_summary, "No summary yet.");
        assert_eq!(config.extraction.max_attempts, 3);
        assert_eq!(config.keywords.chunk_size, 2500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: LecternConfig = toml::from_str("").unwrap();
        assert_eq!(config, LecternConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
[oracle]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"

[summarize]
strategy = "sequential"
map_concurrency = 2

[memory]
start_on = "user"
commit_trimmed = true
"#;
        let config: LecternConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.oracle.provider, ProviderType::OpenAi);
        assert_eq!(config.oracle.model, "gpt-4o-mini");
        assert_eq!(config.oracle.max_tokens, 1024);
        assert_eq!(config.summarize.strategy, SummaryStrategy::Sequential);
        assert_eq!(config.summarize.map_concurrency, 2);
        assert_eq!(config.summarize.chunk_size, 6000);
        assert!(config.memory.commit_trimmed);
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_size() {
        let mut config = LecternConfig::default();
        config.chunking.chunk_overlap = 1000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunking.chunk_overlap"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = LecternConfig::default();
        config.extraction.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = LecternConfig::default();
        config.summarize.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_strategy_parse() {
        assert_eq!(
            "map-reduce".parse::<SummaryStrategy>().unwrap(),
            SummaryStrategy::MapReduce
        );
        assert_eq!(
            "Sequential".parse::<SummaryStrategy>().unwrap(),
            SummaryStrategy::Sequential
        );
        assert!("tree".parse::<SummaryStrategy>().is_err());
    }
}
