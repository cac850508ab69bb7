//! Text extraction from uploaded documents.
//!
//! Uses external tools on PATH: `pdftoppm` (Poppler) rasterizes PDF pages
//! and `tesseract` runs OCR over page images and standalone images. The
//! pipeline talks to this module only through the [`TextExtractor`] trait so
//! the OCR backend can be swapped or stubbed in tests.

mod extractor;

pub use extractor::{ExtractionError, TesseractExtractor};

use async_trait::async_trait;

/// Collaborator interface for OCR text extraction.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from document bytes. Multi-page documents concatenate
    /// page text with a newline separator.
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractionError>;
}
