//! Application state: the configured oracle, the loaded document and the
//! assistant wired over them.
//!
//! The assistant is generic over oracle and retriever; `AppState` pins it to
//! the OpenAI-compatible provider and the lexical retriever.

use std::path::PathBuf;
use std::sync::Arc;

use lectern_core::assistant::DocumentAssistant;
use lectern_core::document::load_document;
use lectern_core::llm::token_counter::CharRatioCounter;
use lectern_core::oracle::ProviderOracle;
use lectern_infra::document::FsDocumentSource;
use lectern_infra::llm::create_oracle;
use lectern_infra::retrieval::LexicalRetriever;
use lectern_types::chat::SessionId;
use lectern_types::config::LecternConfig;

pub type ConcreteAssistant = DocumentAssistant<ProviderOracle, LexicalRetriever>;

pub struct AppState {
    pub assistant: Arc<ConcreteAssistant>,
    pub oracle: Arc<ProviderOracle>,
    pub config: LecternConfig,
    pub docs: PathBuf,
    pub session_id: SessionId,
}

impl AppState {
    /// Build the oracle for `model`, load everything under `docs` and index it.
    pub async fn init(mut config: LecternConfig, model: String, docs: PathBuf) -> anyhow::Result<Self> {
        config.oracle.model = model;
        let oracle = Arc::new(create_oracle(&config.oracle)?);

        let source = FsDocumentSource::new(&docs);
        let document = load_document(&source).await?;

        let assistant = DocumentAssistant::new(
            oracle.clone(),
            Arc::new(CharRatioCounter::default()),
            document,
            &config,
            LexicalRetriever::new,
        )?;

        Ok(Self {
            assistant: Arc::new(assistant),
            oracle,
            config,
            docs,
            session_id: SessionId::generate(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.oracle.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_types::error::DocumentError;

    #[tokio::test]
    async fn test_init_loads_and_indexes_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("paper.md"), "Graphs\x0cAbstract: graphs are fun").unwrap();

        let state = AppState::init(LecternConfig::default(), "mistral".into(), dir.path().into())
            .await
            .unwrap();

        assert_eq!(state.model(), "mistral");
        assert_eq!(state.oracle.model(), "mistral");
        let passages = state.assistant.find("graphs", 2).await.unwrap();
        assert!(!passages.is_empty());
    }

    #[tokio::test]
    async fn test_init_fails_without_documents() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppState::init(LecternConfig::default(), "llama3".into(), dir.path().into())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<DocumentError>(),
            Some(DocumentError::Empty(_))
        ));
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "text").unwrap();
        let mut config = LecternConfig::default();
        config.extraction.max_attempts = 0;
        assert!(AppState::init(config, "llama3".into(), dir.path().into()).await.is_err());
    }
}
