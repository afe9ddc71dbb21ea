//! Schema-validated oracle output with bounded retry.

use std::sync::Arc;

use lectern_types::extraction::{ExtractionResult, ExtractionSchema};
use lectern_types::llm::LlmError;

use crate::oracle::TextOracle;
use crate::prompt::Prompt;

use super::parse::parse_fields;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Variable filled with the schema's format instructions when a template
/// asks for it and the caller did not set it.
pub const FORMAT_INSTRUCTIONS_VAR: &str = "format_instructions";

/// Asks the oracle for JSON matching a schema, re-asking with the identical
/// prompt when the output is malformed.
///
/// Malformed output never escapes as an error: after `max_attempts` the
/// result is `valid == false` with every required field defaulted. Oracle
/// transport failures are returned as `Err` and not retried.
pub struct StructuredExtractor<O> {
    oracle: Arc<O>,
    max_attempts: u32,
}

impl<O: TextOracle> StructuredExtractor<O> {
    /// `max_attempts` below one is raised to one.
    pub fn new(oracle: Arc<O>, max_attempts: u32) -> Self {
        Self {
            oracle,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn oracle(&self) -> &Arc<O> {
        &self.oracle
    }

    #[tracing::instrument(
        name = "extract_structured",
        skip(self, prompt, schema),
        fields(
            prompt = prompt.name(),
            max_attempts = self.max_attempts,
            field_count = schema.fields.len(),
        )
    )]
    pub async fn extract(
        &self,
        prompt: &Prompt,
        schema: &ExtractionSchema,
    ) -> Result<ExtractionResult, LlmError> {
        let mut prompt = prompt.clone();
        if prompt
            .template
            .variables()
            .iter()
            .any(|v| v == FORMAT_INSTRUCTIONS_VAR)
        {
            prompt
                .vars
                .entry(FORMAT_INSTRUCTIONS_VAR.to_string())
                .or_insert_with(|| schema.format_instructions());
        }

        let mut raw_output = String::new();
        for attempt in 1..=self.max_attempts {
            raw_output = self.oracle.generate(&prompt).await?;
            match parse_fields(schema, &raw_output) {
                Ok(fields) => {
                    tracing::debug!(attempt, "structured output accepted");
                    return Ok(ExtractionResult {
                        valid: true,
                        fields,
                        attempts: attempt,
                        raw_output,
                    });
                }
                Err(failure) => {
                    tracing::debug!(attempt, error = %failure, "malformed structured output");
                }
            }
        }

        tracing::warn!(
            attempts = self.max_attempts,
            output_preview = %preview(&raw_output),
            "structured extraction exhausted its attempts; using defaults"
        );
        Ok(ExtractionResult {
            valid: false,
            fields: schema.required_defaults(),
            attempts: self.max_attempts,
            raw_output,
        })
    }
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptTemplate;
    use crate::testing::StubOracle;
    use lectern_types::extraction::{FieldKind, FieldSpec};
    use serde_json::json;

    fn schema() -> ExtractionSchema {
        ExtractionSchema::default()
            .field(FieldSpec::required("title", FieldKind::Text))
            .field(FieldSpec::required("authors", FieldKind::TextList))
            .field(FieldSpec::required("year", FieldKind::Integer))
    }

    fn prompt() -> Prompt {
        Prompt::new(PromptTemplate::new("info", "{format_instructions}\n{page}")).var("page", "p1")
    }

    const VALID: &str = r#"{"title": "T", "authors": ["A"], "year": 2001}"#;

    #[tokio::test]
    async fn test_first_attempt_valid() {
        let oracle = Arc::new(StubOracle::scripted(vec![VALID]));
        let extractor = StructuredExtractor::new(oracle.clone(), 3);
        let result = extractor.extract(&prompt(), &schema()).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.integer("year"), Some(2001));
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_k_malformed_then_valid_within_budget() {
        for k in 0..3usize {
            let mut script = vec!["not json"; k];
            script.push(VALID);
            let oracle = Arc::new(StubOracle::scripted(script));
            let extractor = StructuredExtractor::new(oracle.clone(), 3);
            let result = extractor.extract(&prompt(), &schema()).await.unwrap();
            assert!(result.valid);
            assert_eq!(result.attempts as usize, k + 1);
            assert_eq!(oracle.call_count(), k + 1);
        }
    }

    #[tokio::test]
    async fn test_fails_closed_when_budget_exhausted() {
        let oracle = Arc::new(StubOracle::scripted(vec!["nope", "[1]", "{\"year\": \"x\"}", VALID]));
        let extractor = StructuredExtractor::new(oracle.clone(), 3);
        let result = extractor.extract(&prompt(), &schema()).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.raw_output, "{\"year\": \"x\"}");
        assert_eq!(result.get("title"), Some(&json!("")));
        assert_eq!(result.get("authors"), Some(&json!([])));
        assert_eq!(result.get("year"), Some(&json!(0)));
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retries_use_identical_prompt() {
        let oracle = Arc::new(StubOracle::scripted(vec!["bad", "bad", VALID]));
        let extractor = StructuredExtractor::new(oracle.clone(), 3);
        extractor.extract(&prompt(), &schema()).await.unwrap();
        let calls = oracle.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|p| p.vars == calls[0].vars));
        assert!(calls[0].vars["format_instructions"].contains("\"authors\""));
    }

    #[tokio::test]
    async fn test_oracle_error_is_not_retried() {
        let oracle = Arc::new(StubOracle::new(|_| Err(LlmError::Timeout(30))));
        let extractor = StructuredExtractor::new(oracle.clone(), 3);
        let err = extractor.extract(&prompt(), &schema()).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(30)));
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_is_raised_to_one() {
        let oracle = Arc::new(StubOracle::constant("garbage"));
        let extractor = StructuredExtractor::new(oracle.clone(), 0);
        assert_eq!(extractor.max_attempts(), 1);
        let result = extractor.extract(&prompt(), &schema()).await.unwrap();
        assert!(!result.valid);
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_caller_format_instructions_win() {
        let oracle = Arc::new(StubOracle::constant(VALID));
        let extractor = StructuredExtractor::new(oracle.clone(), 1);
        let prompt = prompt().var("format_instructions", "custom");
        extractor.extract(&prompt, &schema()).await.unwrap();
        assert_eq!(oracle.calls()[0].vars["format_instructions"], "custom");
    }
}
