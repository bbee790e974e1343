use super::types::{ExtractionMethod, PageResult};

/// Confidence thresholds used by the orchestrator (0-100 scale)
pub mod thresholds {
    /// Native text layer accepted without OCR.
    pub const NATIVE: f32 = 95.0;

    /// Below this, OCR output is reconciled with the native text layer.
    pub const HYBRID: f32 = 60.0;

    /// Reported when every OCR path failed and only a sparse text layer remains.
    pub const PARTIAL_NATIVE: f32 = 30.0;
}

/// OCR text must be this many times longer than the native text to replace it
/// in a hybrid merge.
pub const HYBRID_LENGTH_RATIO: f64 = 1.5;

/// Compute overall OCR confidence from per-page results.
///
/// Weighted by text length, so a blank page read at 0% does not drag down a
/// document whose other pages are dense and confident.
pub fn compute_overall_confidence(pages: &[PageResult]) -> f32 {
    let total_chars: usize = pages.iter().map(|p| p.text.chars().count()).sum();
    if total_chars == 0 {
        return 0.0;
    }

    let weighted_sum: f64 = pages
        .iter()
        .map(|p| p.confidence as f64 * p.text.chars().count() as f64)
        .sum();

    (weighted_sum / total_chars as f64) as f32
}

/// True when at least one page produced non-blank text.
pub fn has_text(pages: &[PageResult]) -> bool {
    pages.iter().any(|p| !p.text.trim().is_empty())
}

/// Join page texts in page order, separated by a blank line.
pub fn join_pages(pages: &[PageResult]) -> String {
    pages
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Outcome of reconciling OCR output with the native text layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedText {
    pub text: String,
    pub method: ExtractionMethod,
}

/// Reconcile a successful OCR pass with the native text layer.
///
/// Low-confidence OCR next to a non-empty text layer becomes `Hybrid`: the OCR
/// text is kept only when it is substantially longer than the native text.
pub fn merge_with_native(ocr_text: String, ocr_confidence: f32, native_text: &str) -> MergedText {
    if ocr_confidence >= thresholds::HYBRID || native_text.trim().is_empty() {
        return MergedText {
            text: ocr_text,
            method: ExtractionMethod::Ocr,
        };
    }

    let ocr_len = ocr_text.chars().count() as f64;
    let native_len = native_text.chars().count() as f64;
    let text = if ocr_len > native_len * HYBRID_LENGTH_RATIO {
        ocr_text
    } else {
        native_text.to_string()
    };

    MergedText {
        text,
        method: ExtractionMethod::Hybrid,
    }
}
