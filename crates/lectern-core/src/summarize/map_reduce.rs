//! Map-reduce with hierarchical reduction.

use futures_util::{StreamExt, TryStreamExt};

use lectern_types::document::DocumentChunk;
use lectern_types::llm::LlmError;

use crate::oracle::TextOracle;
use crate::prompt::Prompt;
use crate::prompt::templates::{MAP_SUMMARY, REDUCE_SUMMARY};

use super::SummarizationEngine;

/// Separator between partial summaries handed to a reduce call.
const PARTIAL_SEPARATOR: &str = "\n";

impl<O: TextOracle> SummarizationEngine<O> {
    /// Map every chunk, then reduce. Zero chunks returns an empty string
    /// without calling the oracle.
    #[tracing::instrument(
        name = "summarize_map_reduce",
        skip(self, chunks),
        fields(chunk_count = chunks.len(), concurrency = self.settings.map_concurrency)
    )]
    pub async fn map_reduce(&self, chunks: &[DocumentChunk]) -> Result<String, LlmError> {
        if chunks.is_empty() {
            return Ok(String::new());
        }
        let partials = self.map(chunks).await?;
        self.reduce(partials).await
    }

    /// Summarize every chunk independently, at most `map_concurrency` calls
    /// in flight. Results keep chunk order; the first failure aborts.
    pub async fn map(&self, chunks: &[DocumentChunk]) -> Result<Vec<String>, LlmError> {
        futures_util::stream::iter(chunks.iter().map(|chunk| self.map_one(chunk)))
            .buffered(self.settings.map_concurrency.max(1))
            .try_collect()
            .await
    }

    async fn map_one(&self, chunk: &DocumentChunk) -> Result<String, LlmError> {
        let prompt = Prompt::new(MAP_SUMMARY).var("chunk", chunk.text.as_str());
        let summary = self.oracle.generate(&prompt).await?;
        tracing::debug!(chunk = chunk.index, "mapped chunk");
        Ok(summary)
    }

    /// Reduce partial summaries into one.
    ///
    /// While the joined partials exceed `reduce_token_budget`, they are
    /// grouped into batches that fit and each batch is reduced. If no batch
    /// would hold more than one partial, neighbours are paired instead so
    /// every round shrinks the list. A round that leaves a single summary
    /// ends the reduction.
    pub async fn reduce(&self, partials: Vec<String>) -> Result<String, LlmError> {
        let budget = self.settings.reduce_token_budget;
        let mut level = partials;
        let mut round = 0u32;

        loop {
            if round > 0 && level.len() == 1 {
                return Ok(level.remove(0));
            }
            let joined = level.join(PARTIAL_SEPARATOR);
            if level.len() <= 1 || self.counter.estimate_tokens(&joined) <= budget {
                return self.reduce_one(joined).await;
            }

            let mut batches = self.batch(&level);
            if batches.len() == level.len() {
                batches = level.chunks(2).map(<[String]>::to_vec).collect();
            }
            round += 1;
            tracing::debug!(
                round,
                partials = level.len(),
                batches = batches.len(),
                "hierarchical reduce"
            );

            level = futures_util::stream::iter(
                batches
                    .into_iter()
                    .map(|batch| self.reduce_one(batch.join(PARTIAL_SEPARATOR))),
            )
            .buffered(self.settings.map_concurrency.max(1))
            .try_collect()
            .await?;
        }
    }

    /// Greedy grouping: consecutive partials while the joined batch fits.
    fn batch(&self, partials: &[String]) -> Vec<Vec<String>> {
        let budget = self.settings.reduce_token_budget;
        let mut batches: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for partial in partials {
            if !current.is_empty() {
                let mut candidate = current.join(PARTIAL_SEPARATOR);
                candidate.push_str(PARTIAL_SEPARATOR);
                candidate.push_str(partial);
                if self.counter.estimate_tokens(&candidate) > budget {
                    batches.push(std::mem::take(&mut current));
                }
            }
            current.push(partial.clone());
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    async fn reduce_one(&self, summaries: String) -> Result<String, LlmError> {
        let prompt = Prompt::new(REDUCE_SUMMARY).var("summaries", summaries);
        self.oracle.generate(&prompt).await
    }
}
