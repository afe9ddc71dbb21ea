//! Token-overlap retrieval.
//!
//! Each chunk is indexed as a set of lowercase word tokens. A query scores
//! a chunk by the IDF-weighted share of its distinct tokens the chunk
//! contains, so rare query words count for more than common ones.

use std::collections::{HashMap, HashSet};

use lectern_core::retrieval::Retriever;
use lectern_types::document::{DocumentChunk, Passage};
use lectern_types::error::RetrievalError;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "was", "what", "which", "with",
];

/// Lowercased words with surrounding punctuation removed, stopwords dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|s| !s.is_empty() && !STOPWORDS.contains(&s.as_str()))
        .collect()
}

struct IndexedChunk {
    chunk: DocumentChunk,
    terms: HashSet<String>,
}

pub struct LexicalRetriever {
    chunks: Vec<IndexedChunk>,
    document_frequency: HashMap<String, usize>,
}

impl LexicalRetriever {
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let chunks: Vec<IndexedChunk> = chunks
            .into_iter()
            .map(|chunk| {
                let terms: HashSet<String> = tokenize(&chunk.text).into_iter().collect();
                for term in &terms {
                    *document_frequency.entry(term.clone()).or_default() += 1;
                }
                IndexedChunk { chunk, terms }
            })
            .collect();
        tracing::debug!(
            chunks = chunks.len(),
            vocabulary = document_frequency.len(),
            "built lexical index"
        );
        Self {
            chunks,
            document_frequency,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.chunks.len() as f32;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f32;
        (1.0 + n / (1.0 + df)).ln()
    }

    /// Scored passages, best first; ties keep document order. Chunks sharing
    /// no token with the query are left out.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        if self.chunks.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        let weights: Vec<(&String, f32)> = query_terms.iter().map(|t| (t, self.idf(t))).collect();
        let total: f32 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .filter_map(|indexed| {
                let matched: f32 = weights
                    .iter()
                    .filter(|(term, _)| indexed.terms.contains(*term))
                    .map(|(_, w)| w)
                    .sum();
                (matched > 0.0).then_some((matched / total, indexed))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.chunk.index.cmp(&b.1.chunk.index))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, indexed)| Passage {
                chunk_index: indexed.chunk.index,
                source: indexed.chunk.source.clone(),
                page_range: indexed.chunk.page_range,
                text: indexed.chunk.text.clone(),
                score,
            })
            .collect())
    }
}

impl Retriever for LexicalRetriever {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        self.search(query, k)
    }
}
