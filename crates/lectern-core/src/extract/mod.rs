//! Structured output from the oracle.
//!
//! [`StructuredExtractor`] is the generic piece: prompt plus schema in,
//! validated fields out, with bounded retry. The remaining extractors are
//! document-specific pipelines built on it.

pub mod extractor;
pub mod keywords;
pub mod paper_info;
pub mod parse;
pub mod theme;

pub use extractor::{DEFAULT_MAX_ATTEMPTS, StructuredExtractor};
pub use keywords::KeywordsExtractor;
pub use paper_info::PaperInfoExtractor;
pub use parse::ParseFailure;
pub use theme::ThemeExtractor;
