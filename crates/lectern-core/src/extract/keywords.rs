//! Keyword extraction, from a summary or chunk by chunk.

use std::collections::HashSet;
use std::sync::Arc;

use lectern_types::config::KeywordsConfig;
use lectern_types::document::DocumentChunk;
use lectern_types::extraction::{ExtractionSchema, FieldKind, FieldSpec};
use lectern_types::llm::LlmError;

use crate::oracle::TextOracle;
use crate::prompt::Prompt;
use crate::prompt::templates::{CHUNK_KEYWORDS, GIST_KEYWORDS, SUMMARY_KEYWORDS, UNIQUE_KEYWORDS};
use crate::summarize::SummarizationEngine;

use super::extractor::StructuredExtractor;

pub fn keywords_schema() -> ExtractionSchema {
    ExtractionSchema::default().field(FieldSpec::required("keywords", FieldKind::TextList))
}

/// Case-insensitive de-duplication keeping first occurrences, in order.
/// Blank entries are dropped and the rest trimmed.
pub fn dedupe_keywords(keywords: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .collect()
}

pub struct KeywordsExtractor<O> {
    extractor: StructuredExtractor<O>,
    summarizer: Arc<SummarizationEngine<O>>,
    per_chunk: usize,
    gist: usize,
}

impl<O: TextOracle> KeywordsExtractor<O> {
    pub fn new(
        oracle: Arc<O>,
        summarizer: Arc<SummarizationEngine<O>>,
        max_attempts: u32,
        config: &KeywordsConfig,
    ) -> Self {
        Self {
            extractor: StructuredExtractor::new(oracle, max_attempts),
            summarizer,
            per_chunk: config.per_chunk,
            gist: config.gist,
        }
    }

    /// Default pipeline: map-reduce summary, then keywords from the
    /// abstract and that summary.
    #[tracing::instrument(name = "extract_keywords", skip_all, fields(chunk_count = chunks.len()))]
    pub async fn extract(
        &self,
        abstract_text: &str,
        chunks: &[DocumentChunk],
    ) -> Result<Vec<String>, LlmError> {
        let summary = self.summarizer.map_reduce(chunks).await?;
        self.from_summary(abstract_text, &summary).await
    }

    /// One structured call over abstract and summary. Invalid output yields
    /// no keywords.
    pub async fn from_summary(
        &self,
        abstract_text: &str,
        summary: &str,
    ) -> Result<Vec<String>, LlmError> {
        let prompt = Prompt::new(SUMMARY_KEYWORDS)
            .var("abstract", abstract_text)
            .var("summary", summary);
        let result = self.extractor.extract(&prompt, &keywords_schema()).await?;
        if !result.valid {
            tracing::warn!("keyword extraction from summary produced no valid output");
        }
        Ok(dedupe_keywords(result.text_list("keywords")))
    }

    /// Keywords per chunk, then a uniqueness pass, then a gist pass.
    ///
    /// A chunk whose extraction stays invalid is skipped. If a later pass is
    /// invalid, the previous list is kept (de-duplicated locally).
    #[tracing::instrument(name = "extract_keywords_by_chunk", skip_all, fields(chunk_count = chunks.len()))]
    pub async fn from_chunks(&self, chunks: &[DocumentChunk]) -> Result<Vec<String>, LlmError> {
        let schema = keywords_schema();
        let mut all = Vec::new();

        for chunk in chunks {
            let prompt = Prompt::new(CHUNK_KEYWORDS)
                .var("max", self.per_chunk.to_string())
                .var("text", chunk.text.as_str());
            let result = self.extractor.extract(&prompt, &schema).await?;
            if !result.valid {
                tracing::warn!(chunk = chunk.index, "skipping chunk with invalid keyword output");
                continue;
            }
            all.extend(result.text_list("keywords").into_iter().take(self.per_chunk));
        }
        if all.is_empty() {
            return Ok(all);
        }

        let unique = self.refine(UNIQUE_KEYWORDS.into(), &all, None).await?;
        let mut gist = self.refine(GIST_KEYWORDS.into(), &unique, Some(self.gist)).await?;
        gist.truncate(self.gist);
        Ok(gist)
    }

    async fn refine(
        &self,
        prompt: Prompt,
        keywords: &[String],
        max: Option<usize>,
    ) -> Result<Vec<String>, LlmError> {
        let mut prompt = prompt.var("keywords", keywords.join(", "));
        if let Some(max) = max {
            prompt = prompt.var("max", max.to_string());
        }
        let result = self.extractor.extract(&prompt, &keywords_schema()).await?;
        if result.valid {
            Ok(dedupe_keywords(result.text_list("keywords")))
        } else {
            tracing::warn!(prompt = prompt.name(), "keyword pass invalid; keeping previous list");
            Ok(dedupe_keywords(keywords.iter().cloned()))
        }
    }
}
