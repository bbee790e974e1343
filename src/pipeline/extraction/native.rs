use std::sync::LazyLock;

use regex::Regex;

use super::types::{NativeText, NativeTextExtractor, PageMethod, PageResult};
use super::ExtractionError;

/// Characters per page above which the text layer is trusted without OCR.
pub const NATIVE_DENSITY_THRESHOLD: f64 = 500.0;

/// Confidence reported for an accepted native text layer.
pub const NATIVE_CONFIDENCE: f32 = super::confidence::thresholds::NATIVE;

/// Form feed or a run of 3+ newlines marks a page boundary in a flat text layer.
static PAGE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x0C|\n{3,}").expect("valid page break regex"));

/// Text layer extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl NativeTextExtractor for PdfTextExtractor {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<NativeText, ExtractionError> {
        // pdf-extract panics on some malformed font dictionaries.
        let pages = std::panic::catch_unwind(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        })
        .map_err(|_| ExtractionError::PdfParsing("text layer parser panicked".into()))?
        .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let page_count = pages.len();
        tracing::debug!(
            pages = page_count,
            chars = pages.iter().map(|p| p.chars().count()).sum::<usize>(),
            "Native text layer extracted"
        );
        let text = pages.join("\x0C");

        Ok(NativeText { text, page_count })
    }
}

/// Count pages from the PDF page tree without decoding content streams.
pub fn count_pages(pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
    let doc = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|e| ExtractionError::PdfParsing(format!("Failed to parse PDF: {e}")))?;
    Ok(doc.get_pages().len())
}

/// Rebuild page boundaries from a flat text layer.
pub fn split_pages(text: &str) -> Vec<String> {
    PAGE_BREAK
        .split(text)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Page results for a native text layer, numbered from 1.
pub fn native_pages(text: &str, confidence: f32) -> Vec<PageResult> {
    split_pages(text)
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageResult {
            page_number: i + 1,
            text,
            confidence,
            method: PageMethod::Native,
        })
        .collect()
}

/// Mock text layer for orchestrator tests.
pub struct MockNativeExtractor {
    result: Result<NativeText, String>,
}

impl MockNativeExtractor {
    pub fn new(text: &str, page_count: usize) -> Self {
        Self {
            result: Ok(NativeText {
                text: text.to_string(),
                page_count,
            }),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
        }
    }
}

impl NativeTextExtractor for MockNativeExtractor {
    fn extract(&self, _pdf_bytes: &[u8]) -> Result<NativeText, ExtractionError> {
        self.result
            .clone()
            .map_err(ExtractionError::PdfParsing)
    }
}
