//! Plain-text and markdown documents on disk.
//!
//! A path may name one file or a directory. Directories contribute every
//! supported file directly inside them, in file-name order. Inside a file a
//! form feed (`\x0c`) starts a new page.

use std::path::{Path, PathBuf};

use lectern_core::document::DocumentSource;
use lectern_types::document::SourcePage;
use lectern_types::error::DocumentError;

pub const PAGE_BREAK: char = '\x0c';

const SUPPORTED_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    path: PathBuf,
}

impl FsDocumentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    }

    async fn files(&self) -> Result<Vec<PathBuf>, DocumentError> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DocumentError::NotFound(self.path.display().to_string()),
            _ => fs_error(&self.path, e),
        })?;

        if metadata.is_file() {
            if !Self::is_supported(&self.path) {
                return Err(DocumentError::Unsupported(self.path.display().to_string()));
            }
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| fs_error(&self.path, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| fs_error(&self.path, e))? {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file && Self::is_supported(&path) {
                files.push(path);
            } else if is_file {
                tracing::debug!(path = %path.display(), "skipping unsupported file");
            }
        }
        files.sort();
        Ok(files)
    }
}

fn fs_error(path: &Path, err: std::io::Error) -> DocumentError {
    DocumentError::FileSystem(format!("{}: {err}", path.display()))
}

/// Split file contents into pages on form feeds. Text without a form feed
/// is a single page.
pub fn split_pages(source: &str, text: &str) -> Vec<SourcePage> {
    text.split(PAGE_BREAK)
        .enumerate()
        .map(|(i, page)| SourcePage {
            source: source.to_string(),
            page: i as u32 + 1,
            text: page.to_string(),
        })
        .collect()
}

impl DocumentSource for FsDocumentSource {
    async fn load(&self) -> Result<Vec<SourcePage>, DocumentError> {
        let files = self.files().await?;
        if files.is_empty() {
            return Err(DocumentError::Empty(self.path.display().to_string()));
        }

        let mut pages = Vec::new();
        for file in &files {
            let text = tokio::fs::read_to_string(file)
                .await
                .map_err(|e| fs_error(file, e))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let file_pages = split_pages(&name, &text);
            tracing::debug!(file = %name, pages = file_pages.len(), "read document file");
            pages.extend(file_pages);
        }
        Ok(pages)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
