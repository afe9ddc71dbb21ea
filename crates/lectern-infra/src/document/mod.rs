//! Document sources backed by the local filesystem.

pub mod fs_source;

pub use fs_source::FsDocumentSource;
