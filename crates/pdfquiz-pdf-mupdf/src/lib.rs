use std::path::Path;

use mupdf::{Document, TextPageFlags};

use pdfquiz_core::{BackendError, PdfBackend};

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency so
/// that the rest of the workspace does not transitively depend on it.
///
/// Whole pages are kept by default. Running headers and footers can be
/// dropped by excluding a band at the top or bottom of each page.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    /// Fraction of page height from the top to exclude (0.0–1.0).
    header_exclusion_ratio: Option<f32>,
    /// Fraction of page height from the bottom to exclude (0.0–1.0).
    footer_exclusion_ratio: Option<f32>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop text blocks lying entirely in the top `ratio` of each page. `0.0` disables.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = normalize_ratio(ratio);
        self
    }

    /// Drop text blocks starting in the bottom `ratio` of each page. `0.0` disables.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = normalize_ratio(ratio);
        self
    }

    fn page_text(&self, page: &mupdf::Page) -> Result<String, BackendError> {
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::Extraction(e.to_string()))?;

        let bounds = page
            .bounds()
            .map_err(|e| BackendError::Extraction(e.to_string()))?;
        let height = bounds.y1 - bounds.y0;
        let header_limit = self.header_exclusion_ratio.map(|r| bounds.y0 + height * r);
        let footer_limit = self.footer_exclusion_ratio.map(|r| bounds.y1 - height * r);

        let mut text = String::new();
        for block in text_page.blocks() {
            let block_bounds = block.bounds();
            if header_limit.is_some_and(|limit| block_bounds.y1 <= limit) {
                continue;
            }
            if footer_limit.is_some_and(|limit| block_bounds.y0 >= limit) {
                continue;
            }

            for line in block.lines() {
                text.extend(line.chars().map(|c| c.char().unwrap_or('\u{FFFD}')));
                text.push('\n');
            }
        }
        Ok(text)
    }
}

fn normalize_ratio(ratio: f32) -> Option<f32> {
    if ratio > 0.0 {
        Some(ratio.min(1.0))
    } else {
        None
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::Open("invalid path encoding".into()))?;

        let document = Document::open(path_str).map_err(|e| BackendError::Open(e.to_string()))?;

        let mut pages = Vec::new();
        for page in document
            .pages()
            .map_err(|e| BackendError::Extraction(e.to_string()))?
        {
            let page = page.map_err(|e| BackendError::Extraction(e.to_string()))?;
            pages.push(self.page_text(&page)?);
        }

        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted PDF text");
        Ok(pages.join(PAGE_SEPARATOR))
    }
}
