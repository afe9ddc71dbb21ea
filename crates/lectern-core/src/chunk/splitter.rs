//! Bounded-size overlapping text chunks.

use std::sync::Arc;

use lectern_types::config::ChunkingConfig;
use lectern_types::document::{Document, DocumentChunk, PageRange};
use lectern_types::error::ConfigError;

/// Preferred chunk endings, strongest first. A chunk ends just after one.
const BOUNDARIES: [&str; 3] = ["\n\n", "\n", " "];

/// Splits text into ordered chunks of at most `chunk_size` characters.
///
/// Sizes are measured in Unicode scalar values (`char`), not bytes.
///
/// Consecutive chunks share exactly `chunk_overlap` characters: each chunk
/// after the first starts `chunk_overlap` characters before the previous one
/// ended. A chunk prefers to end just after a paragraph break, then a line
/// break, then a space, as long as that boundary falls in the second half of
/// the window and leaves the chunk longer than the overlap. Otherwise it is
/// cut at exactly `chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkSplitter {
    /// Fails unless `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily iterate over the chunks of `text`.
    pub fn chunks<'a>(&self, text: &'a str) -> ChunkIter<'a> {
        let mut offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        offsets.push(text.len());
        ChunkIter {
            text,
            offsets: offsets.into(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            next_start: 0,
            index: 0,
            done: text.is_empty(),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<DocumentChunk> {
        self.chunks(text).collect()
    }

    /// Split a document's page-joined text. Every chunk records the pages
    /// it touches and inherits the document's metadata.
    pub fn split_document(&self, document: &Document) -> Vec<DocumentChunk> {
        let text = document.text();
        let offsets = document.page_offsets();

        self.chunks(&text)
            .map(|mut chunk| {
                let end = chunk.start_char + chunk.char_len();
                let first = page_at(&offsets, chunk.start_char);
                let last = page_at(&offsets, end.saturating_sub(1));
                if let (Some(first), Some(last)) = (first, last) {
                    chunk.page_range = Some(PageRange {
                        first: document.pages[first].page,
                        last: document.pages[last].page,
                    });
                    chunk.source = Some(document.pages[first].source.clone());
                }
                chunk.metadata = Some(document.metadata.clone());
                chunk
            })
            .collect()
    }

    /// Rebuild the original text from a full chunk sequence.
    pub fn reassemble(&self, chunks: &[DocumentChunk]) -> String {
        reassemble(chunks, self.chunk_overlap)
    }
}

/// Concatenate chunks, dropping the first `overlap` characters of every
/// chunk after the first.
pub fn reassemble(chunks: &[DocumentChunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.text);
        } else {
            out.extend(chunk.text.chars().skip(overlap));
        }
    }
    out
}

/// Index of the page containing character `pos`.
fn page_at(offsets: &[usize], pos: usize) -> Option<usize> {
    match offsets.partition_point(|&o| o <= pos) {
        0 => None,
        n => Some(n - 1),
    }
}

/// Iterator over the chunks of one text. Cloning restarts from the
/// clone point without re-scanning the text.
#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()` as a sentinel.
    offsets: Arc<[usize]>,
    chunk_size: usize,
    chunk_overlap: usize,
    next_start: usize,
    index: usize,
    done: bool,
}

impl ChunkIter<'_> {
    fn char_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    /// End (exclusive, in chars) of the chunk starting at `start`, when the
    /// remaining text does not fit in one chunk.
    fn chunk_end(&self, start: usize) -> usize {
        let hard_end = start + self.chunk_size;
        let min_end = (start + self.chunk_size / 2 + 1).max(start + self.chunk_overlap + 1);
        let window = self.slice(start, hard_end);

        for sep in BOUNDARIES {
            if let Some(pos) = window.rfind(sep) {
                let end = start + window[..pos + sep.len()].chars().count();
                if end >= min_end {
                    return end;
                }
            }
        }
        hard_end
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = DocumentChunk;

    fn next(&mut self) -> Option<DocumentChunk> {
        if self.done {
            return None;
        }

        let start = self.next_start;
        let total = self.char_count();
        let end = if total - start <= self.chunk_size {
            self.done = true;
            total
        } else {
            let end = self.chunk_end(start);
            self.next_start = end - self.chunk_overlap;
            end
        };

        let chunk = DocumentChunk {
            index: self.index,
            text: self.slice(start, end).to_string(),
            start_char: start,
            page_range: None,
            source: None,
            metadata: None,
        };
        self.index += 1;
        Some(chunk)
    }
}

impl std::iter::FusedIterator for ChunkIter<'_> {}
