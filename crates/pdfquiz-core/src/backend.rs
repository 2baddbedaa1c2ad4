use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    Open(String),
    #[error("failed to extract text: {0}")]
    Extraction(String),
    #[error("the PDF contains no extractable text")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors only turn a document into plain text; summarisation and
/// quiz generation work on the returned string and never see the PDF.
pub trait PdfBackend: Send + Sync {
    /// Extract the full text content of a PDF file, pages separated by a blank line.
    fn extract_text(&self, path: &Path) -> Result<String, BackendError>;
}

/// Run a backend and reject documents that yield only whitespace.
pub fn extract_non_empty(backend: &dyn PdfBackend, path: &Path) -> Result<String, BackendError> {
    let text = backend.extract_text(path)?;
    if text.trim().is_empty() {
        return Err(BackendError::Empty);
    }
    Ok(text)
}
