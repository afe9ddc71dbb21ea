//! Title, authors, year and abstract of a document.

use std::sync::Arc;

use lectern_types::document::{DocumentInfo, SourcePage};
use lectern_types::extraction::{ExtractionSchema, FieldKind, FieldSpec};
use lectern_types::llm::LlmError;

use crate::oracle::TextOracle;
use crate::prompt::Prompt;
use crate::prompt::templates::{ABSTRACT_CHECK, ABSTRACT_EXTRACT, PAPER_INFO};

use super::extractor::StructuredExtractor;

pub fn paper_info_schema() -> ExtractionSchema {
    ExtractionSchema::default()
        .field(FieldSpec::required("title", FieldKind::Text))
        .field(FieldSpec::required("authors", FieldKind::TextList))
        .field(FieldSpec::required("year", FieldKind::Integer))
}

pub struct PaperInfoExtractor<O> {
    extractor: StructuredExtractor<O>,
}

impl<O: TextOracle> PaperInfoExtractor<O> {
    pub fn new(oracle: Arc<O>, max_attempts: u32) -> Self {
        Self {
            extractor: StructuredExtractor::new(oracle, max_attempts),
        }
    }

    /// Bibliographic fields come from the first page; the abstract from
    /// the first page the oracle says contains one.
    #[tracing::instrument(name = "extract_paper_info", skip(self, pages), fields(page_count = pages.len()))]
    pub async fn extract_info(&self, pages: &[SourcePage]) -> Result<DocumentInfo, LlmError> {
        let Some(first) = pages.first() else {
            return Ok(DocumentInfo::default());
        };

        let prompt = Prompt::new(PAPER_INFO).var("page", first.text.as_str());
        let result = self.extractor.extract(&prompt, &paper_info_schema()).await?;
        if !result.valid {
            tracing::warn!("could not read title/authors/year; using defaults");
        }

        Ok(DocumentInfo {
            title: result.text("title").unwrap_or_default().trim().to_string(),
            authors: result.text_list("authors"),
            year: result.integer("year").unwrap_or_default(),
            abstract_text: self.find_abstract(pages).await?,
        })
    }

    /// Ask page by page whether it holds an abstract; extract from the
    /// first that does. Empty when none does.
    pub async fn find_abstract(&self, pages: &[SourcePage]) -> Result<String, LlmError> {
        let oracle = self.extractor.oracle();
        for page in pages {
            let check = Prompt::new(ABSTRACT_CHECK).var("text", page.text.as_str());
            let answer = oracle.generate(&check).await?;
            if answer.to_lowercase().contains("true") {
                tracing::debug!(page = page.page, "abstract found");
                let extract = Prompt::new(ABSTRACT_EXTRACT).var("page", page.text.as_str());
                return Ok(oracle.generate(&extract).await?.trim().to_string());
            }
        }
        Ok(String::new())
    }
}
