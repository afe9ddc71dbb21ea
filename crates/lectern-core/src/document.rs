//! Document loading seam.

use std::future::Future;

use lectern_types::document::{Document, DocumentMetadata, SourcePage};
use lectern_types::error::DocumentError;

/// Anything that can produce the pages of a document.
pub trait DocumentSource: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<Vec<SourcePage>, DocumentError>> + Send;

    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> String;
}

/// Load every page and wrap them in a [`Document`] with empty metadata.
/// Fails with [`DocumentError::Empty`] when no page has any text.
pub async fn load_document<S: DocumentSource>(source: &S) -> Result<Document, DocumentError> {
    let pages = source.load().await?;
    if pages.iter().all(|p| p.text.trim().is_empty()) {
        return Err(DocumentError::Empty(source.describe()));
    }
    tracing::info!(source = %source.describe(), pages = pages.len(), "document loaded");
    Ok(Document::new(DocumentMetadata::default(), pages))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages(Vec<&'static str>);

    impl DocumentSource for Pages {
        async fn load(&self) -> Result<Vec<SourcePage>, DocumentError> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, t)| SourcePage {
                    source: "mem".to_string(),
                    page: i as u32 + 1,
                    text: t.to_string(),
                })
                .collect())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    #[tokio::test]
    async fn test_load_document_keeps_pages() {
        let doc = load_document(&Pages(vec!["a", "b"])).await.unwrap();
        assert_eq!(doc.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_source_is_empty_error() {
        let err = load_document(&Pages(vec![" ", ""])).await.unwrap_err();
        assert!(matches!(err, DocumentError::Empty(_)));
    }
}
