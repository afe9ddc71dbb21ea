//! Document, page, and chunk types.
//!
//! A `Document` is an ordered list of page-like text blocks plus metadata.
//! Splitting a document produces `DocumentChunk`s that remember which pages
//! they cover and inherit the document's metadata.

use serde::{Deserialize, Serialize};

/// Separator inserted between pages when a document is flattened to text.
pub const PAGE_SEPARATOR: &str = "\n";

/// Bibliographic metadata inherited by every chunk of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub year: i64,
    pub url: String,
}

/// One page-like block of text from a document source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePage {
    /// Source identifier, usually a file path.
    pub source: String,
    /// 1-based page number within the source.
    pub page: u32,
    pub text: String,
}

/// A loaded document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub abstract_text: String,
    pub pages: Vec<SourcePage>,
}

impl Document {
    pub fn new(metadata: DocumentMetadata, pages: Vec<SourcePage>) -> Self {
        Self {
            metadata,
            abstract_text: String::new(),
            pages,
        }
    }

    /// Flatten the pages into one text, joined by [`PAGE_SEPARATOR`].
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Character offset at which each page starts in [`Document::text`].
    pub fn page_offsets(&self) -> Vec<usize> {
        let sep = PAGE_SEPARATOR.chars().count();
        let mut offsets = Vec::with_capacity(self.pages.len());
        let mut offset = 0;
        for page in &self.pages {
            offsets.push(offset);
            offset += page.text.chars().count() + sep;
        }
        offsets
    }

    /// Apply extracted information to the document.
    pub fn apply_info(&mut self, info: &DocumentInfo) {
        if !info.title.is_empty() {
            self.metadata.title = info.title.clone();
        }
        if !info.authors.is_empty() {
            self.metadata.authors = info.authors.clone();
        }
        if info.year != 0 {
            self.metadata.year = info.year;
        }
        if !info.abstract_text.is_empty() {
            self.abstract_text = info.abstract_text.clone();
        }
    }
}

/// Inclusive range of 1-based page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

/// A bounded-size contiguous slice of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Ordinal position in the split sequence.
    pub index: usize,
    pub text: String,
    /// Character offset of the chunk in the source text.
    pub start_char: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_range: Option<PageRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl DocumentChunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Title/authors/year/abstract pulled out of a document by the oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: String,
    pub authors: Vec<String>,
    pub year: i64,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

/// A passage returned by a retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub chunk_index: usize,
    pub source: Option<String>,
    pub page_range: Option<PageRange>,
    pub text: String,
    pub score: f32,
}
