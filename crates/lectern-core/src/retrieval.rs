//! Retrieval seam used by the session runtime for context passages.

use std::future::Future;
use std::sync::Arc;

use lectern_types::document::Passage;
use lectern_types::error::RetrievalError;

/// Finds the passages most relevant to a query.
pub trait Retriever: Send + Sync {
    /// Up to `k` passages, best first.
    fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> impl Future<Output = Result<Vec<Passage>, RetrievalError>> + Send;
}

impl<R: Retriever> Retriever for Arc<R> {
    fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> impl Future<Output = Result<Vec<Passage>, RetrievalError>> + Send {
        (**self).similarity_search(query, k)
    }
}

/// A retriever that never finds anything. Turns run on abstract and
/// history alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetriever;

impl Retriever for NoRetriever {
    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<Passage>, RetrievalError> {
        Ok(Vec::new())
    }
}

/// Join passages into the context block handed to the chat prompt.
pub fn format_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
