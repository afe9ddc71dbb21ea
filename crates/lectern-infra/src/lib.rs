//! Infrastructure for Lectern.
//!
//! Concrete implementations of the seams defined in `lectern-core`: the
//! OpenAI-compatible provider (Ollama, OpenAI), filesystem document
//! sources, a lexical retriever and configuration loading.

pub mod config;
pub mod document;
pub mod llm;
pub mod retrieval;
