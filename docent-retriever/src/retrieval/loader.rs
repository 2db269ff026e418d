//! PDF loading: turn files into [`Page`]s.
//!
//! Files are read asynchronously and parsed on the blocking pool, one file at
//! a time in the order given. A file that cannot be read or parsed is
//! recorded as a [`LoadError`] and skipped; the rest of the batch still
//! loads. A single page whose text cannot be extracted becomes a page with
//! empty text, which the chunker then drops.

use crate::error::{Result, RetrieverError};
use docent_context::Page;
use lopdf::Document;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Why a file could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum LoadErrorKind {
    #[error("file not found")]
    NotFound,
    #[error("read failed: {0}")]
    Io(String),
    #[error("not a readable PDF: {0}")]
    Parse(String),
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// A file that was skipped during loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}: {kind}", path.display())]
pub struct LoadError {
    pub path: PathBuf,
    pub kind: LoadErrorKind,
}

impl LoadError {
    fn new(path: &Path, kind: LoadErrorKind) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
        }
    }

    fn from_io(path: &Path, err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => LoadErrorKind::NotFound,
            _ => LoadErrorKind::Io(err.to_string()),
        };
        Self::new(path, kind)
    }
}

/// Outcome of loading a batch of files.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Pages of every file that loaded, in file order then page order
    pub pages: Vec<Page>,
    /// Files that were skipped, in the order they were attempted
    pub failures: Vec<LoadError>,
}

impl LoadReport {
    /// Number of distinct source files that contributed pages.
    pub fn files_loaded(&self) -> usize {
        let mut sources: Vec<&str> = self.pages.iter().map(|p| p.source_path.as_str()).collect();
        sources.dedup();
        sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Load every file in `paths`, collecting per-file failures instead of stopping.
pub async fn load_pdfs(paths: &[PathBuf]) -> LoadReport {
    let mut report = LoadReport::default();

    for path in paths {
        match load_pdf(path).await {
            Ok(pages) => {
                tracing::debug!("Loaded {} pages from {}", pages.len(), path.display());
                report.pages.extend(pages);
            }
            Err(err) => {
                tracing::warn!("Skipping {}", err);
                report.failures.push(err);
            }
        }
    }

    tracing::info!(
        "Loaded {} pages from {} files ({} skipped)",
        report.pages.len(),
        paths.len() - report.failures.len(),
        report.failures.len()
    );
    report
}

/// Load the pages of a single PDF file.
pub async fn load_pdf(path: &Path) -> std::result::Result<Vec<Page>, LoadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LoadError::from_io(path, e))?;

    let source = path.display().to_string();
    tokio::task::spawn_blocking(move || extract_pages(&source, &bytes))
        .await
        .map_err(|e| LoadError::new(path, LoadErrorKind::Task(e.to_string())))?
        .map_err(|message| LoadError::new(path, LoadErrorKind::Parse(message)))
}

/// Parse PDF bytes and extract the text of each page.
///
/// Page numbers are 1-based. A page whose text cannot be extracted gets an
/// empty string.
pub fn extract_pages(source: &str, bytes: &[u8]) -> std::result::Result<Vec<Page>, String> {
    let document = Document::load_mem(bytes).map_err(|e| e.to_string())?;

    let pages = document
        .get_pages()
        .keys()
        .map(|&number| {
            let text = match document.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("No text extracted from {} page {}: {}", source, number, e);
                    String::new()
                }
            };
            Page::new(source, number as usize, text)
        })
        .collect();

    Ok(pages)
}

/// List the PDF files directly inside `dir`, sorted by path.
///
/// Only paths accepted by [`should_index_file`] are listed, so hidden files
/// are skipped. Subdirectories are not searched. A directory that does not exist holds no
/// PDFs.
pub async fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let scan_err = |source: std::io::Error| RetrieverError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Knowledge base directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(scan_err(e)),
    };

    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        let path = entry.path();
        if should_index_file(&path) && entry.file_type().await.map_err(scan_err)?.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Whether a directory scan should pick up `path`: a PDF that is not hidden.
pub fn should_index_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'));

    !hidden && is_pdf_path(path)
}

/// True for paths with a `.pdf` extension, in any case.
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
