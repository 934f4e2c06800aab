pub mod chunker;
pub mod corpus;
mod pdf;

use pdfchat_core::UploadedFile;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: '{0}' (only PDF files are accepted)")]
    UnsupportedType(String),
    #[error("Not a valid PDF: {0}")]
    InvalidPdf(String),
    #[error("PDF contains no extractable text (scanned or image-only PDFs are not supported)")]
    NoText,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A page of extracted text.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-based page number.
    pub page_number: usize,
    /// The extracted text content.
    pub text: String,
}

/// Result of extracting text from a document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename.
    pub filename: String,
    /// Size of the uploaded file in bytes.
    pub file_size: usize,
    /// Extracted pages with text.
    pub pages: Vec<PageContent>,
}

/// Separator placed between pages by [`ExtractedDocument::full_text`].
pub const PAGE_SEPARATOR: &str = "\n\n";

impl ExtractedDocument {
    /// Get all text concatenated.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Total character count across all pages.
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Extract text from one uploaded file.
pub fn extract_text(file: &UploadedFile) -> Result<ExtractedDocument, ExtractionError> {
    let ext = file.extension();
    if ext != "pdf" {
        return Err(ExtractionError::UnsupportedType(ext));
    }

    let pages = pdf::extract_pdf(&file.bytes)?;

    Ok(ExtractedDocument {
        filename: file.name.clone(),
        file_size: file.size(),
        pages,
    })
}

/// A file that could not be loaded, with the reason.
#[derive(Debug)]
pub struct LoadFailure {
    pub filename: String,
    pub error: ExtractionError,
}

/// Outcome of loading a batch of uploads.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<ExtractedDocument>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Extract every file independently. A bad file is recorded as a failure and
/// the remaining files are still processed.
pub fn load_batch(files: &[UploadedFile]) -> LoadReport {
    let mut report = LoadReport::default();
    for file in files {
        match extract_text(file) {
            Ok(doc) => {
                info!(
                    "Extracted '{}': {} pages, {} chars",
                    doc.filename,
                    doc.pages.len(),
                    doc.total_chars()
                );
                report.documents.push(doc);
            }
            Err(error) => {
                warn!(file = %file.name, error = %error, "Skipping file");
                report.failures.push(LoadFailure {
                    filename: file.name.clone(),
                    error,
                });
            }
        }
    }
    report
}
