//! One loaded document wired to the summarizer, the extractors and a
//! session runtime.

use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tokio_util::sync::CancellationToken;

use lectern_types::chat::SessionId;
use lectern_types::config::LecternConfig;
use lectern_types::document::{Document, DocumentChunk, DocumentInfo, Passage};
use lectern_types::error::{ConfigError, RetrievalError, SessionError};
use lectern_types::llm::LlmError;

use crate::chunk::ChunkSplitter;
use crate::extract::{KeywordsExtractor, PaperInfoExtractor, ThemeExtractor};
use crate::llm::token_counter::TokenCounter;
use crate::memory::ConversationMemory;
use crate::oracle::TextOracle;
use crate::retrieval::Retriever;
use crate::session::{SessionRuntime, SessionStream};
use crate::summarize::{SummarizationEngine, SummarizeSettings};

pub struct DocumentAssistant<O, R> {
    document: RwLock<Document>,
    info: OnceCell<DocumentInfo>,
    retriever: Arc<R>,
    runtime: SessionRuntime<O, R>,
    summarizer: Arc<SummarizationEngine<O>>,
    summary_splitter: ChunkSplitter,
    keyword_splitter: ChunkSplitter,
    paper_info: PaperInfoExtractor<O>,
    keywords: KeywordsExtractor<O>,
    theme: ThemeExtractor<O>,
}

impl<O, R> DocumentAssistant<O, R>
where
    O: TextOracle + 'static,
    R: Retriever + 'static,
{
    /// Validate `config`, split the document for retrieval and hand those
    /// chunks to `build_retriever`.
    pub fn new(
        oracle: Arc<O>,
        counter: Arc<dyn TokenCounter>,
        document: Document,
        config: &LecternConfig,
        build_retriever: impl FnOnce(Vec<DocumentChunk>) -> R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let retrieval_chunks = ChunkSplitter::from_config(&config.chunking)?.split_document(&document);
        tracing::info!(
            pages = document.pages.len(),
            chunks = retrieval_chunks.len(),
            "indexing document"
        );
        let retriever = Arc::new(build_retriever(retrieval_chunks));

        let memory = Arc::new(ConversationMemory::from_config(counter.clone(), &config.memory));
        let runtime = SessionRuntime::new(oracle.clone(), memory)
            .with_retriever(retriever.clone(), config.retrieval.k);

        let summarizer = Arc::new(SummarizationEngine::new(
            oracle.clone(),
            counter,
            SummarizeSettings::from(&config.summarize),
        ));
        let max_attempts = config.extraction.max_attempts;

        Ok(Self {
            document: RwLock::new(document),
            info: OnceCell::new(),
            retriever,
            runtime,
            summary_splitter: ChunkSplitter::new(
                config.summarize.chunk_size,
                config.summarize.chunk_overlap,
            )?,
            keyword_splitter: ChunkSplitter::new(config.keywords.chunk_size, 0)?,
            paper_info: PaperInfoExtractor::new(oracle.clone(), max_attempts),
            keywords: KeywordsExtractor::new(
                oracle.clone(),
                summarizer.clone(),
                max_attempts,
                &config.keywords,
            ),
            theme: ThemeExtractor::new(oracle),
            summarizer,
        })
    }

    pub fn runtime(&self) -> &SessionRuntime<O, R> {
        &self.runtime
    }

    /// Title, authors, year and abstract. Extracted on first use, then
    /// merged into the document metadata and the chat prompt.
    pub async fn info(&self) -> Result<&DocumentInfo, LlmError> {
        self.info
            .get_or_try_init(|| async {
                let info = {
                    let document = self.document.read().await;
                    self.paper_info.extract_info(&document.pages).await?
                };
                self.document.write().await.apply_info(&info);
                self.runtime.set_abstract(info.abstract_text.clone()).await;
                tracing::info!(title = %info.title, year = info.year, "document info extracted");
                Ok::<_, LlmError>(info)
            })
            .await
    }

    pub async fn ask(&self, session_id: &SessionId, question: &str) -> Result<String, SessionError> {
        self.info().await?;
        self.runtime.ask(session_id, question).await
    }

    pub async fn ask_cancellable(
        &self,
        session_id: &SessionId,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SessionError> {
        self.info().await?;
        self.runtime.ask_cancellable(session_id, question, cancel).await
    }

    pub async fn ask_stream(
        &self,
        session_id: SessionId,
        question: String,
        cancel: CancellationToken,
    ) -> Result<SessionStream, SessionError> {
        self.info().await?;
        Ok(self.runtime.ask_stream(session_id, question, cancel))
    }

    /// Summary of the whole document with the configured strategy.
    pub async fn summarize(&self) -> Result<String, LlmError> {
        let chunks = self.summary_chunks().await;
        self.summarizer.summarize(&chunks).await
    }

    /// Keywords from a map-reduce summary and the abstract.
    pub async fn keywords(&self) -> Result<Vec<String>, LlmError> {
        let abstract_text = self.info().await?.abstract_text.clone();
        let chunks = self.summary_chunks().await;
        self.keywords.extract(&abstract_text, &chunks).await
    }

    /// Keywords gathered chunk by chunk, without a summary.
    pub async fn keywords_by_chunk(&self) -> Result<Vec<String>, LlmError> {
        let chunks = {
            let document = self.document.read().await;
            self.keyword_splitter.split_document(&document)
        };
        self.keywords.from_chunks(&chunks).await
    }

    pub async fn theme(&self) -> Result<String, LlmError> {
        let keywords = self.keywords().await?;
        self.theme.describe(&keywords).await
    }

    pub async fn find(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        self.retriever.similarity_search(query, k).await
    }

    async fn summary_chunks(&self) -> Vec<DocumentChunk> {
        let document = self.document.read().await;
        self.summary_splitter.split_document(&document)
    }
}
