//! Document chunking.

pub mod splitter;

pub use splitter::{ChunkIter, ChunkSplitter, reassemble};
