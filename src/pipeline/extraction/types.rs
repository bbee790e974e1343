use std::cell::OnceCell;

use serde::{Deserialize, Serialize};

use super::cloud_ocr::CloudOcrFailure;
use super::ExtractionError;

/// Result of text extraction from a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    /// 0-100
    pub confidence: f32,
    pub method: ExtractionMethod,
    pub pages: Vec<PageResult>,
    pub processing_time_ms: u64,
}

/// How the document text was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtractionMethod {
    Native,
    #[serde(rename = "OCR")]
    Ocr,
    /// OCR ran with low confidence and was reconciled with the native text layer.
    Hybrid,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "Native",
            Self::Ocr => "OCR",
            Self::Hybrid => "Hybrid",
        }
    }
}

/// How a single page was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PageMethod {
    Native,
    #[serde(rename = "OCR")]
    Ocr,
}

/// Per-page extraction result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageResult {
    /// 1-based
    pub page_number: usize,
    pub text: String,
    pub confidence: f32,
    pub method: PageMethod,
}

impl PageResult {
    pub fn ocr(page_number: usize, text: String, confidence: f32) -> Self {
        Self {
            page_number,
            text,
            confidence,
            method: PageMethod::Ocr,
        }
    }

    /// Empty zero-confidence OCR page, recorded when a page could not be read.
    pub fn failed(page_number: usize) -> Self {
        Self::ocr(page_number, String::new(), 0.0)
    }
}

/// A rendered page, PNG-encoded.
///
/// Owned by the rasterize → preprocess → OCR chain and dropped once OCR has consumed it.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based
    pub page_number: usize,
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// PDF input for one processing request. Page count is derived on first use.
#[derive(Debug)]
pub struct RawDocument {
    bytes: Vec<u8>,
    page_count: OnceCell<usize>,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            page_count: OnceCell::new(),
        }
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, ExtractionError> {
        Ok(Self::new(std::fs::read(path)?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of pages, parsed from the PDF structure once and cached.
    /// Unparseable documents report zero pages.
    pub fn page_count(&self) -> usize {
        *self.page_count.get_or_init(|| {
            super::native::count_pages(&self.bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Cannot count PDF pages");
                0
            })
        })
    }

    /// Record a page count already obtained elsewhere (native parsing).
    pub fn set_page_count(&self, count: usize) {
        let _ = self.page_count.set(count);
    }
}

/// Embedded text layer of a PDF.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeText {
    pub text: String,
    pub page_count: usize,
}

impl NativeText {
    /// Average characters per page; zero for a document without pages.
    ///
    /// Form feeds separate pages and are not counted.
    pub fn char_density(&self) -> f64 {
        if self.page_count == 0 {
            return 0.0;
        }
        let chars = self.text.chars().filter(|c| *c != '\x0C').count();
        chars as f64 / self.page_count as f64
    }
}

/// Raw OCR result from a local engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// 0-100
    pub confidence: f32,
}

/// Per-page progress callback: `(page_number, total_pages)`.
pub type ProgressFn<'a> = &'a dyn Fn(usize, usize);

/// PDF text layer extraction abstraction
pub trait NativeTextExtractor {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<NativeText, ExtractionError>;
}

/// Renders PDF pages to images for OCR.
pub trait PageRasterizer {
    /// Render every page, in page order, at `scale` × the PDF's native size.
    fn render_pages(
        &self,
        pdf_bytes: &[u8],
        scale: f32,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<PageImage>, ExtractionError>;
}

/// Cleans a rendered page before OCR. Pure image-to-image transform.
pub trait ImagePreprocessor {
    fn preprocess(&self, page: &PageImage) -> Result<PageImage, ExtractionError>;
}

/// Free on-box OCR engine (allows mocking for tests)
pub trait OcrEngine {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError>;
}

/// Paid remote OCR engine.
pub trait CloudOcrClient {
    /// False when disabled by configuration or when credentials are missing/invalid.
    fn is_available(&self) -> bool;

    /// Annotate already rendered page images, one result per input page.
    fn annotate_images(&self, pages: &[PageImage]) -> Result<Vec<PageResult>, CloudOcrFailure>;

    /// Annotate the PDF directly, without local rendering.
    fn annotate_pdf(
        &self,
        pdf_bytes: &[u8],
        page_count: usize,
    ) -> Result<Vec<PageResult>, CloudOcrFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_density_divides_by_pages() {
        let native = NativeText {
            text: "a".repeat(1800),
            page_count: 3,
        };
        assert!((native.char_density() - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn char_density_counts_characters_not_bytes() {
        let native = NativeText {
            text: "é".repeat(10),
            page_count: 1,
        };
        assert!((native.char_density() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn char_density_ignores_page_separators() {
        let native = NativeText {
            text: ["a".repeat(500), "a".repeat(500)].join("\x0C"),
            page_count: 2,
        };
        assert_eq!(native.char_density(), 500.0);
    }

    #[test]
    fn char_density_zero_pages() {
        let native = NativeText {
            text: "text".into(),
            page_count: 0,
        };
        assert_eq!(native.char_density(), 0.0);
    }

    #[test]
    fn method_serializes_with_ocr_uppercase() {
        assert_eq!(serde_json::to_string(&ExtractionMethod::Ocr).unwrap(), "\"OCR\"");
        assert_eq!(serde_json::to_string(&ExtractionMethod::Hybrid).unwrap(), "\"Hybrid\"");
        assert_eq!(serde_json::to_string(&PageMethod::Native).unwrap(), "\"Native\"");
    }

    #[test]
    fn raw_document_page_count_can_be_preset() {
        let doc = RawDocument::new(b"not a pdf".to_vec());
        doc.set_page_count(4);
        assert_eq!(doc.page_count(), 4);
    }

    #[test]
    fn raw_document_unparseable_has_zero_pages() {
        let doc = RawDocument::new(b"not a pdf".to_vec());
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn failed_page_is_empty_and_zero_confidence() {
        let page = PageResult::failed(3);
        assert_eq!(page.page_number, 3);
        assert!(page.text.is_empty());
        assert_eq!(page.confidence, 0.0);
        assert_eq!(page.method, PageMethod::Ocr);
    }
}
