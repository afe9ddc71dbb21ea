//! Observability for lectern: subscriber setup and the attribute names
//! shared by LLM call spans.

pub mod genai_attrs;
pub mod tracing_setup;
