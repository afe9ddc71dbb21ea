//! Error types for configuration, sessions, documents and retrieval.

use thiserror::Error;

use crate::llm::LlmError;

/// Invalid setup; fatal and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from a conversational turn.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session '{0}' is closed")]
    Closed(String),

    #[error(transparent)]
    Oracle(#[from] LlmError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("turn cancelled")]
    Cancelled,
}

/// Errors from loading documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("no readable documents under '{0}'")]
    Empty(String),

    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("filesystem error: {0}")]
    FileSystem(String),
}

/// Errors from similarity search.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retriever has no indexed passages")]
    EmptyIndex,

    #[error("retrieval backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid("chunk_size must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: chunk_size must be greater than 0"
        );
    }

    #[test]
    fn test_session_error_from_llm() {
        let err: SessionError = LlmError::Timeout(500).into();
        assert!(matches!(err, SessionError::Oracle(LlmError::Timeout(500))));
        assert_eq!(err.to_string(), "request timed out after 500ms");
    }

    #[test]
    fn test_session_closed_display() {
        let err = SessionError::Closed("abc".to_string());
        assert_eq!(err.to_string(), "session 'abc' is closed");
    }
}
