//! PDF → plain text.
//!
//! The pipeline only needs best-effort, newline-delimited text in roughly
//! reading order. PDF structure parsing is left to `pdf-extract`; this crate
//! wraps it behind [`TextExtractor`] so the pipeline can be driven with any
//! extractor.

use async_trait::async_trait;
use bytes::Bytes;
use masterlist_shared::{MasterlistError, Result};
use tracing::{debug, warn};

/// How far into the payload the `%PDF` header may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Converts an uploaded document into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the document's text. Errors abort the ingestion.
    async fn extract_text(&self, data: Bytes) -> Result<String>;
}

/// [`TextExtractor`] backed by the `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, data: Bytes) -> Result<String> {
        if !looks_like_pdf(&data) {
            return Err(MasterlistError::Extraction(
                "payload has no %PDF header".into(),
            ));
        }

        let size = data.len();
        // pdf-extract is synchronous and CPU bound; it can also panic on
        // malformed input, which surfaces here as a JoinError.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
            .await
            .map_err(|e| MasterlistError::Extraction(format!("extractor aborted: {e}")))?
            .map_err(|e| MasterlistError::Extraction(e.to_string()))?;

        if text.trim().is_empty() {
            warn!(size, "PDF text extraction returned empty");
        } else {
            debug!(size, text_len = text.len(), "PDF text extracted");
        }

        Ok(text)
    }
}

/// Cheap signature check before handing bytes to the PDF parser.
pub fn looks_like_pdf(data: &[u8]) -> bool {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_signature_detection() {
        assert!(looks_like_pdf(b"%PDF-1.4\n"));
        assert!(looks_like_pdf(b"\xef\xbb\xbf%PDF-1.7\n"));
        assert!(!looks_like_pdf(b"\x89PNG\r\n\x1a\n"));
        assert!(!looks_like_pdf(b""));
        assert!(!looks_like_pdf(b"%PD"));
    }

    #[test]
    fn signature_must_be_near_start() {
        let mut data = vec![b' '; HEADER_SEARCH_WINDOW];
        data.extend_from_slice(b"%PDF-1.4");
        assert!(!looks_like_pdf(&data));
    }

    #[tokio::test]
    async fn non_pdf_payload_is_rejected() {
        let err = PdfTextExtractor::new()
            .extract_text(Bytes::from_static(b"\x89PNG\r\n\x1a\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, MasterlistError::Extraction(_)));
        assert!(err.to_string().contains("%PDF"));
    }
}
