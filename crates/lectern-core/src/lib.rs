//! Control logic for long-document conversation and summarization.
//!
//! Everything here talks to the model through [`oracle::TextOracle`] and to
//! the outside world through the [`retrieval::Retriever`] and
//! [`document::DocumentSource`] seams. Concrete backends live in
//! `lectern-infra`; this crate does no IO of its own.

pub mod assistant;
pub mod chunk;
pub mod document;
pub mod extract;
pub mod llm;
pub mod memory;
pub mod oracle;
pub mod prompt;
pub mod retrieval;
pub mod session;
pub mod summarize;

#[cfg(test)]
mod testing;
