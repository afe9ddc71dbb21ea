//! Sequential fold.

use lectern_types::document::DocumentChunk;
use lectern_types::llm::LlmError;

use crate::oracle::TextOracle;
use crate::prompt::Prompt;
use crate::prompt::templates::FOLD_SUMMARY;

use super::SummarizationEngine;

/// Running summary threaded through a fold by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryState {
    pub text: String,
    /// Index of the last chunk folded in, `None` before the first step.
    pub last_folded: Option<usize>,
}

impl SummaryState {
    pub fn initial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            last_folded: None,
        }
    }

    /// Fold one chunk in. Consumes the previous state.
    pub async fn step<O: TextOracle>(
        self,
        oracle: &O,
        chunk: &DocumentChunk,
    ) -> Result<SummaryState, LlmError> {
        let prompt = Prompt::new(FOLD_SUMMARY)
            .var("page", chunk.text.as_str())
            .var("last_summary", self.text);
        let text = oracle.generate(&prompt).await?;
        Ok(SummaryState {
            text,
            last_folded: Some(chunk.index),
        })
    }
}

impl<O: TextOracle> SummarizationEngine<O> {
    /// One oracle call per chunk, in order. Zero chunks returns the initial
    /// summary without calling the oracle.
    #[tracing::instrument(
        name = "summarize_fold",
        skip(self, chunks),
        fields(chunk_count = chunks.len())
    )]
    pub async fn fold(&self, chunks: &[DocumentChunk]) -> Result<SummaryState, LlmError> {
        let mut state = SummaryState::initial(self.settings.initial_summary.clone());
        for chunk in chunks {
            state = state.step(self.oracle.as_ref(), chunk).await?;
            tracing::debug!(chunk = chunk.index, summary_chars = state.text.len(), "folded chunk");
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::chunk::ChunkSplitter;
    use crate::llm::token_counter::CharRatioCounter;
    use crate::summarize::SummarizeSettings;
    use crate::testing::StubOracle;
    use lectern_types::config::{DEFAULT_INITIAL_SUMMARY, SummaryStrategy};

    /// Appends the part of the page not already present at the end of the
    /// summary, so overlapping chunks concatenate back into the source text.
    fn appending_oracle(overlap: usize) -> StubOracle {
        StubOracle::new(move |prompt| {
            let last = &prompt.vars["last_summary"];
            let page = &prompt.vars["page"];
            if last == DEFAULT_INITIAL_SUMMARY {
                Ok(page.clone())
            } else {
                Ok(format!("{last}{}", page.chars().skip(overlap).collect::<String>()))
            }
        })
    }

    fn engine(oracle: Arc<StubOracle>) -> SummarizationEngine<StubOracle> {
        let settings = SummarizeSettings {
            strategy: SummaryStrategy::Sequential,
            ..SummarizeSettings::default()
        };
        SummarizationEngine::new(oracle, Arc::new(CharRatioCounter::default()), settings)
    }

    #[tokio::test]
    async fn test_zero_chunks_returns_initial_without_calls() {
        let oracle = Arc::new(StubOracle::constant("unused"));
        let engine = engine(oracle.clone());
        let state = engine.fold(&[]).await.unwrap();
        assert_eq!(state, SummaryState::initial(DEFAULT_INITIAL_SUMMARY));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exactly_n_ordered_calls() {
        let oracle = Arc::new(StubOracle::new(|prompt| {
            Ok(format!("{}|{}", prompt.vars["last_summary"], prompt.vars["page"]))
        }));
        let engine = engine(oracle.clone());
        let chunks = ChunkSplitter::new(5, 0).unwrap().split_text("aaaaabbbbbccccc");

        let state = engine.fold(&chunks).await.unwrap();
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(state.text, "No summary yet.|aaaaa|bbbbb|ccccc");
        assert_eq!(state.last_folded, Some(2));

        let pages: Vec<String> = oracle.calls().iter().map(|p| p.vars["page"].clone()).collect();
        assert_eq!(pages, vec!["aaaaa", "bbbbb", "ccccc"]);
    }

    #[tokio::test]
    async fn test_three_overlapping_chunks_concatenate() {
        let text: String = (0..200).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let splitter = ChunkSplitter::new(100, 50).unwrap();
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks.len(), 3);

        let oracle = Arc::new(appending_oracle(50));
        let summary = engine(oracle.clone())
            .summarize(&chunks)
            .await
            .unwrap();
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(summary, splitter.reassemble(&chunks));
        assert_eq!(summary, text);
    }

    #[tokio::test]
    async fn test_oracle_error_propagates() {
        let oracle = Arc::new(StubOracle::scripted(vec!["first"]));
        let engine = engine(oracle.clone());
        let chunks = ChunkSplitter::new(5, 0).unwrap().split_text("aaaaabbbbbccccc");
        let err = engine.fold(&chunks).await.unwrap_err();
        assert!(matches!(err, LlmError::Provider { .. }));
        assert_eq!(oracle.call_count(), 2);
    }
}
