use std::panic::{self, AssertUnwindSafe};

use super::{ExtractionError, PageContent};

const PDF_MAGIC: &[u8] = b"%PDF-";

pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    // Some producers put junk before the header; readers accept it within the first KiB.
    let head = &bytes[..bytes.len().min(1024)];
    if !head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Err(ExtractionError::InvalidPdf("missing %PDF- header".to_string()));
    }

    // pdf-extract panics on some malformed inputs instead of returning an error.
    let text = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| ExtractionError::InvalidPdf("parser aborted on malformed input".to_string()))?
        .map_err(|e| ExtractionError::InvalidPdf(e.to_string()))?;

    split_pages(&text)
}

/// pdf-extract returns all text as one string. Pages are separated by form
/// feed characters (\x0C) when the producer emits them.
fn split_pages(text: &str) -> Result<Vec<PageContent>, ExtractionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::NoText);
    }

    let pages: Vec<PageContent> = if text.contains('\x0C') {
        text.split('\x0C')
            .enumerate()
            .filter(|(_, page_text)| !page_text.trim().is_empty())
            .map(|(i, page_text)| PageContent {
                page_number: i + 1,
                text: page_text.trim().to_string(),
            })
            .collect()
    } else {
        vec![PageContent {
            page_number: 1,
            text: trimmed.to_string(),
        }]
    };

    Ok(pages)
}
