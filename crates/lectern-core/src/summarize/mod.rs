//! Folding an arbitrarily long chunk sequence into one bounded summary.
//!
//! Two strategies share one entry point, [`SummarizationEngine::summarize`]:
//! - **Sequential**: each chunk is folded into the running summary, one
//!   oracle call per chunk, strictly in order.
//! - **Map-reduce**: every chunk is summarized independently (concurrently,
//!   up to a limit), then the partial summaries are reduced, hierarchically
//!   when they do not fit one call.
//!
//! Oracle failures propagate unchanged; nothing here retries.

mod map_reduce;
mod sequential;

use std::sync::Arc;

use lectern_types::config::{SummarizeConfig, SummaryStrategy};
use lectern_types::document::DocumentChunk;
use lectern_types::llm::LlmError;

use crate::llm::token_counter::TokenCounter;
use crate::oracle::TextOracle;

pub use sequential::SummaryState;

/// Knobs for one engine.
#[derive(Debug, Clone)]
pub struct SummarizeSettings {
    pub strategy: SummaryStrategy,
    pub map_concurrency: usize,
    pub reduce_token_budget: u32,
    pub initial_summary: String,
}

impl From<&SummarizeConfig> for SummarizeSettings {
    fn from(config: &SummarizeConfig) -> Self {
        Self {
            strategy: config.strategy,
            map_concurrency: config.map_concurrency,
            reduce_token_budget: config.reduce_token_budget,
            initial_summary: config.initial_summary.clone(),
        }
    }
}

impl Default for SummarizeSettings {
    fn default() -> Self {
        Self::from(&SummarizeConfig::default())
    }
}

pub struct SummarizationEngine<O> {
    oracle: Arc<O>,
    counter: Arc<dyn TokenCounter>,
    settings: SummarizeSettings,
}

impl<O: TextOracle> SummarizationEngine<O> {
    pub fn new(oracle: Arc<O>, counter: Arc<dyn TokenCounter>, settings: SummarizeSettings) -> Self {
        Self {
            oracle,
            counter,
            settings,
        }
    }

    pub fn settings(&self) -> &SummarizeSettings {
        &self.settings
    }

    /// Summarize with the configured strategy.
    pub async fn summarize(&self, chunks: &[DocumentChunk]) -> Result<String, LlmError> {
        self.summarize_with(self.settings.strategy, chunks).await
    }

    pub async fn summarize_with(
        &self,
        strategy: SummaryStrategy,
        chunks: &[DocumentChunk],
    ) -> Result<String, LlmError> {
        match strategy {
            SummaryStrategy::Sequential => Ok(self.fold(chunks).await?.text),
            SummaryStrategy::MapReduce => self.map_reduce(chunks).await,
        }
    }
}
