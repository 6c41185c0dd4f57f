//! Document text extraction. Converts raw résumé bytes into plain text.
//!
//! Contract: unsupported formats yield empty text rather than an error; only
//! a malformed document of a supported format raises. Callers decide what to
//! do with short or empty output.

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to parse PDF: {0}")]
    Pdf(String),
}

/// Text extraction seam. The pipeline only depends on this trait so tests can
/// substitute a canned extractor.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractError>;
}

/// Default extractor: PDF via `pdf-extract`, plain text passthrough for
/// txt/md, empty text for everything else (images, docx, unknown).
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
        let lower = filename.to_lowercase();

        if lower.ends_with(".pdf") {
            let text = pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ExtractError::Pdf(e.to_string()))?;
            return Ok(normalize_whitespace(&text));
        }

        if lower.ends_with(".txt") || lower.ends_with(".md") {
            return Ok(normalize_whitespace(&String::from_utf8_lossy(bytes)));
        }

        warn!("Unsupported document format for '{filename}', returning empty text");
        Ok(String::new())
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
/// Keeps the downstream hash and prompt payload stable across extractors.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(
            normalize_whitespace("  Name:   Ana\n\nSouza\t\tSkills "),
            "Name: Ana Souza Skills"
        );
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_whitespace("   \n\t "), "");
    }

    #[test]
    fn test_plain_text_passthrough() {
        let extractor = DocumentExtractor;
        let text = extractor
            .extract(b"Name: Ana Souza\nSkills: Python, SQL", "resume.txt")
            .unwrap();
        assert_eq!(text, "Name: Ana Souza Skills: Python, SQL");
    }

    #[test]
    fn test_unsupported_format_yields_empty() {
        let extractor = DocumentExtractor;
        let text = extractor.extract(&[0xFF, 0xD8, 0xFF], "photo.jpg").unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_malformed_pdf_raises() {
        let extractor = DocumentExtractor;
        let result = extractor.extract(b"not a pdf at all", "resume.pdf");
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }
}
