//! Main-theme description from a keyword list.

use std::sync::Arc;

use lectern_types::llm::LlmError;

use crate::oracle::TextOracle;
use crate::prompt::Prompt;
use crate::prompt::templates::THEME;

/// Turns a keyword list into a short description of the document's theme.
pub struct ThemeExtractor<O> {
    oracle: Arc<O>,
}

impl<O: TextOracle> ThemeExtractor<O> {
    pub fn new(oracle: Arc<O>) -> Self {
        Self { oracle }
    }

    /// An empty keyword list describes nothing and makes no call.
    #[tracing::instrument(name = "extract_theme", skip_all, fields(keyword_count = keywords.len()))]
    pub async fn describe(&self, keywords: &[String]) -> Result<String, LlmError> {
        if keywords.is_empty() {
            return Ok(String::new());
        }
        let prompt = Prompt::new(THEME).var("keywords", keywords.join(", "));
        Ok(self.oracle.generate(&prompt).await?.trim().to_string())
    }
}
