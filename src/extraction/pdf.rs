use std::panic;

use super::ExtractionError;

/// Extract each page's text and join the pages with newlines.
pub(super) fn read_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractionError::CorruptDocument("failed to parse PDF".to_string()))?
        .map_err(|error| ExtractionError::CorruptDocument(format!("failed to parse PDF: {error}")))?;

    tracing::debug!(page_count = pages.len(), "PDF text extraction complete");
    Ok(pages.join("\n"))
}
