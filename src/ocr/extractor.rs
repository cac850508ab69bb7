//! Tesseract-based extraction over external tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;

use super::TextExtractor;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// OCR extractor that shells out to `tesseract` and `pdftoppm`.
pub struct TesseractExtractor {
    /// Tesseract language setting.
    language: String,
    /// Rasterization DPI for PDF pages.
    dpi: u32,
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
        }
    }
}

impl TesseractExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Tesseract language.
    #[allow(dead_code)]
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractionError> {
        let bytes = bytes.to_vec();
        let filename = filename.to_string();
        let language = self.language.clone();
        let dpi = self.dpi;

        // Subprocess OCR is CPU- and I/O-heavy; keep it off the async runtime.
        tokio::task::spawn_blocking(move || extract_blocking(&bytes, &filename, &language, dpi))
            .await
            .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))?
    }
}

fn extract_blocking(
    bytes: &[u8],
    filename: &str,
    language: &str,
    dpi: u32,
) -> Result<String, ExtractionError> {
    let temp = TempDir::new()?;

    if is_pdf(bytes, filename) {
        let pdf_path = temp.path().join("input.pdf");
        fs::write(&pdf_path, bytes)?;
        extract_pdf(&pdf_path, temp.path(), language, dpi)
    } else {
        let image_path = temp.path().join(format!("input.{}", extension_of(filename)));
        fs::write(&image_path, bytes)?;
        run_tesseract(&image_path, language)
    }
}

/// Detect PDFs by content magic, falling back to the filename extension.
/// Uploads are routinely mislabeled, so content wins over the extension.
fn is_pdf(bytes: &[u8], filename: &str) -> bool {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type() == "application/pdf";
    }
    extension_of(filename) == "pdf"
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_lowercase()
}

/// Rasterize every PDF page and OCR each one, joining page text with a
/// newline separator.
fn extract_pdf(
    pdf_path: &Path,
    work_dir: &Path,
    language: &str,
    dpi: u32,
) -> Result<String, ExtractionError> {
    let output_prefix = work_dir.join("page");

    let status = Command::new("pdftoppm")
        .args(["-png", "-r", &dpi.to_string()])
        .arg(pdf_path)
        .arg(&output_prefix)
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(_) => {
            return Err(ExtractionError::ExtractionFailed(
                "pdftoppm failed to convert PDF".to_string(),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractionError::ToolNotFound(
                "pdftoppm not found (install poppler-utils)".to_string(),
            ))
        }
        Err(e) => return Err(ExtractionError::Io(e)),
    }

    let pages = find_page_images(work_dir)?;
    if pages.is_empty() {
        return Err(ExtractionError::ExtractionFailed(
            "pdftoppm produced no page images".to_string(),
        ));
    }

    let mut texts = Vec::with_capacity(pages.len());
    for page in &pages {
        texts.push(run_tesseract(page, language)?);
    }
    Ok(texts.join("\n"))
}

/// List generated page images in page order.
///
/// pdftoppm names files `page-1.png`, `page-01.png`, etc. depending on page
/// count, so sort by the parsed page number rather than lexically.
fn find_page_images(work_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();

    for entry in fs::read_dir(work_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(number) = name
            .strip_prefix("page-")
            .and_then(|rest| rest.strip_suffix(".png"))
            .and_then(|num| num.parse::<u32>().ok())
        {
            pages.push((number, path));
        }
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Run Tesseract on an image file.
fn run_tesseract(image_path: &Path, language: &str) -> Result<String, ExtractionError> {
    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout")
        .args(["-l", language])
        .output();

    match output {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "tesseract failed: {}",
                    stderr
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractionError::ToolNotFound(
            "tesseract not found (install tesseract-ocr)".to_string(),
        )),
        Err(e) => Err(ExtractionError::Io(e)),
    }
}
