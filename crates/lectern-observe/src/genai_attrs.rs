//! OpenTelemetry GenAI semantic convention attribute names.
//!
//! `tracing` macros need field names as literals, so spans are declared
//! with the dotted names written out; these constants are for
//! `Span::record` and for anything reading spans back.

/// Provider that served the call (`ollama`, `openai`, ...).
pub const GEN_AI_SYSTEM: &str = "gen_ai.system";

pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";
pub const GEN_AI_REQUEST_STREAM: &str = "gen_ai.request.stream";

/// Filled in once the provider reports usage.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// Name of the prompt template behind a call.
pub const LECTERN_PROMPT: &str = "lectern.prompt";
