//! Retrievers over in-memory chunk indexes.

pub mod lexical;

pub use lexical::LexicalRetriever;
