//! Text extraction for uploaded documents.
//!
//! [`Extractor::extract`] enforces the upload size limit, dispatches on the filename suffix
//! to one of the format readers, then trims and hard-truncates the result. Failures are
//! terminal for the call and carry a user-facing reason string.

mod docx;
mod pdf;
mod text;

use thiserror::Error;

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Errors raised while turning an upload into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Upload exceeded the configured size limit.
    #[error("File exceeds maximum size limit of {limit_mb}MB")]
    TooLarge {
        /// Configured limit in megabytes.
        limit_mb: u64,
    },
    /// Filename suffix does not map to a supported reader.
    #[error("Unsupported file type. Supported formats: PDF, DOCX, TXT")]
    UnsupportedFormat,
    /// The reader could not parse the document structure.
    #[error("Document could not be read: {0}")]
    CorruptDocument(String),
}

/// Document formats understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.txt` files.
    PlainText,
    /// `.pdf` files.
    Pdf,
    /// `.docx` files.
    Docx,
}

impl DocumentFormat {
    /// Resolve the format from a filename suffix, ignoring case.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lowered = filename.to_lowercase();
        if lowered.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lowered.ends_with(".docx") {
            Some(Self::Docx)
        } else if lowered.ends_with(".txt") {
            Some(Self::PlainText)
        } else {
            None
        }
    }
}

/// Size and length limits enforced during extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionLimits {
    /// Largest accepted upload, in megabytes.
    pub max_document_size_mb: u64,
    /// Extracted text is cut to this many characters.
    pub max_extract_chars: usize,
}

/// Format-dispatching text extractor.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    limits: ExtractionLimits,
}

impl Extractor {
    /// Build an extractor enforcing the supplied limits.
    pub fn new(limits: ExtractionLimits) -> Self {
        Self { limits }
    }

    /// Limits this extractor enforces.
    pub fn limits(&self) -> ExtractionLimits {
        self.limits
    }

    /// Extract trimmed, length-bounded text from an upload.
    pub fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        size_bytes: u64,
    ) -> Result<String, ExtractionError> {
        let limit_mb = self.limits.max_document_size_mb;
        if size_bytes > limit_mb.saturating_mul(BYTES_PER_MEGABYTE) {
            tracing::debug!(filename, size_bytes, limit_mb, "Rejected oversized upload");
            return Err(ExtractionError::TooLarge { limit_mb });
        }

        let format =
            DocumentFormat::from_filename(filename).ok_or(ExtractionError::UnsupportedFormat)?;
        let raw = match format {
            DocumentFormat::PlainText => text::read_text(bytes),
            DocumentFormat::Pdf => pdf::read_pdf(bytes)?,
            DocumentFormat::Docx => docx::read_docx(bytes)?,
        };

        let text = truncate_chars(raw.trim(), self.limits.max_extract_chars);
        tracing::debug!(
            filename,
            format = ?format,
            chars = text.chars().count(),
            "Extracted document text"
        );
        Ok(text)
    }
}

/// Cut `text` to at most `max_chars` characters without respecting word boundaries.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(max_extract_chars: usize) -> Extractor {
        Extractor::new(ExtractionLimits {
            max_document_size_mb: 1,
            max_extract_chars,
        })
    }

    #[test]
    fn dispatch_ignores_suffix_case() {
        assert_eq!(
            DocumentFormat::from_filename("REPORT.PDF"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_filename("notes.Docx"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_filename("readme.TXT"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(DocumentFormat::from_filename("image.png"), None);
        assert_eq!(DocumentFormat::from_filename("pdf"), None);
    }

    #[test]
    fn rejects_uploads_over_the_size_limit() {
        let error = extractor(100)
            .extract(b"hello", "a.txt", BYTES_PER_MEGABYTE + 1)
            .expect_err("too large");
        assert!(matches!(error, ExtractionError::TooLarge { limit_mb: 1 }));
        assert_eq!(
            error.to_string(),
            "File exceeds maximum size limit of 1MB"
        );
    }

    #[test]
    fn accepts_uploads_exactly_at_the_size_limit() {
        let text = extractor(100)
            .extract(b"hello", "a.txt", BYTES_PER_MEGABYTE)
            .expect("within limit");
        assert_eq!(text, "hello");
    }

    #[test]
    fn size_check_runs_before_format_dispatch() {
        let error = extractor(100)
            .extract(b"", "a.exe", BYTES_PER_MEGABYTE * 2)
            .expect_err("too large");
        assert!(matches!(error, ExtractionError::TooLarge { .. }));
    }

    #[test]
    fn rejects_unknown_suffixes() {
        let error = extractor(100)
            .extract(b"hello", "archive.zip", 5)
            .expect_err("unsupported");
        assert!(matches!(error, ExtractionError::UnsupportedFormat));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let text = extractor(100)
            .extract(b"\n\n  body text \t\n", "a.txt", 16)
            .expect("text");
        assert_eq!(text, "body text");
    }

    #[test]
    fn truncates_to_exact_character_count() {
        let input = "abcdefghij";
        let text = extractor(4)
            .extract(input.as_bytes(), "a.txt", input.len() as u64)
            .expect("text");
        assert_eq!(text, "abcd");
        assert!(input.starts_with(&text));
    }

    #[test]
    fn leaves_text_at_the_limit_untouched() {
        let text = extractor(10)
            .extract(b"abcdefghij", "a.txt", 10)
            .expect("text");
        assert_eq!(text, "abcdefghij");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let input = "ééééé";
        let text = extractor(3)
            .extract(input.as_bytes(), "a.txt", input.len() as u64)
            .expect("text");
        assert_eq!(text, "ééé");
        assert_eq!(text.chars().count(), 3);
    }

    #[test]
    fn truncation_applies_after_trimming() {
        let text = extractor(3)
            .extract(b"   abcdef", "a.txt", 9)
            .expect("text");
        assert_eq!(text, "abc");
    }

    #[test]
    fn whitespace_only_docx_extracts_to_empty_string() {
        let bytes = docx::tests::docx_fixture(
            "<w:p><w:r><w:t xml:space=\"preserve\">   </w:t></w:r></w:p><w:p/><w:p><w:r><w:t>\t</w:t></w:r></w:p>",
        );
        let text = extractor(100)
            .extract(&bytes, "blank.DOCX", bytes.len() as u64)
            .expect("docx");
        assert_eq!(text, "");
    }

    #[test]
    fn valid_pdf_extracts_every_page() {
        let bytes = pdf::tests::pdf_fixture(&["Alpha", "Bravo"]);
        let text = extractor(1_000)
            .extract(&bytes, "Report.PDF", bytes.len() as u64)
            .expect("pdf");
        let alpha = text.find("Alpha").expect("first page");
        let bravo = text.find("Bravo").expect("second page");
        assert!(alpha < bravo);
        assert!(text[alpha..bravo].contains('\n'));
    }

    #[test]
    fn corrupt_pdf_surfaces_as_corrupt_document() {
        let error = extractor(100)
            .extract(b"%PDF-1.4 not really", "broken.pdf", 19)
            .expect_err("corrupt");
        assert!(matches!(error, ExtractionError::CorruptDocument(_)));
    }
}
