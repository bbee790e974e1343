use std::sync::Arc;
use std::time::Instant;

use super::confidence::{compute_overall_confidence, has_text, join_pages, merge_with_native, thresholds};
use super::local_ocr::run_local_ocr;
use super::native::{native_pages, NATIVE_DENSITY_THRESHOLD};
use super::preprocess::ScanPreprocessor;
use super::types::{
    CloudOcrClient, ExtractionMethod, ExtractionResult, ImagePreprocessor, NativeText,
    NativeTextExtractor, OcrEngine, PageImage, PageRasterizer, PageResult, RawDocument,
};
use super::{CloudOcrFailure, ExtractionError};
use crate::config::DEFAULT_RASTER_SCALE;
use crate::quota::QuotaTracker;

/// Orchestrator states. Each transition is logged at `info`.
enum Stage {
    NativeAttempt,
    OcrRequired,
    PartialNativeFallback,
    Fatal,
    Done(Outcome),
}

struct Outcome {
    text: String,
    confidence: f32,
    method: ExtractionMethod,
    pages: Vec<PageResult>,
}

/// Chooses between the native text layer, cloud OCR and local OCR for one PDF.
/// Uses trait objects for every strategy, enabling dependency injection.
pub struct LegalDocumentExtractor {
    native: Box<dyn NativeTextExtractor + Send + Sync>,
    rasterizer: Option<Box<dyn PageRasterizer + Send + Sync>>,
    preprocessor: Box<dyn ImagePreprocessor + Send + Sync>,
    cloud: Box<dyn CloudOcrClient + Send + Sync>,
    local: Box<dyn OcrEngine + Send + Sync>,
    quota: Arc<QuotaTracker>,
    raster_scale: f32,
}

impl LegalDocumentExtractor {
    pub fn new(
        native: Box<dyn NativeTextExtractor + Send + Sync>,
        cloud: Box<dyn CloudOcrClient + Send + Sync>,
        local: Box<dyn OcrEngine + Send + Sync>,
        quota: Arc<QuotaTracker>,
    ) -> Self {
        Self {
            native,
            rasterizer: None,
            preprocessor: Box::new(ScanPreprocessor),
            cloud,
            local,
            quota,
            raster_scale: DEFAULT_RASTER_SCALE,
        }
    }

    /// Add a page rasterizer. Without one, OCR goes straight to the direct-PDF cloud path.
    pub fn with_rasterizer(mut self, rasterizer: Box<dyn PageRasterizer + Send + Sync>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Box<dyn ImagePreprocessor + Send + Sync>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale;
        self
    }

    /// Extract the text of `doc`.
    ///
    /// Only fails when no strategy produced any text.
    pub fn extract(&self, doc: &RawDocument) -> Result<ExtractionResult, ExtractionError> {
        let start = Instant::now();
        let mut native = NativeText::default();
        let mut stage = Stage::NativeAttempt;

        loop {
            stage = match stage {
                Stage::NativeAttempt => {
                    native = self.read_native(doc);
                    let density = native.char_density();
                    if density > NATIVE_DENSITY_THRESHOLD {
                        tracing::info!(
                            density,
                            pages = native.page_count,
                            "Native text layer accepted"
                        );
                        Stage::Done(Outcome {
                            pages: native_pages(&native.text, thresholds::NATIVE),
                            text: native.text.clone(),
                            confidence: thresholds::NATIVE,
                            method: ExtractionMethod::Native,
                        })
                    } else {
                        tracing::info!(density, "Native text layer insufficient, OCR required");
                        Stage::OcrRequired
                    }
                }
                Stage::OcrRequired => match self.run_ocr(doc, &native) {
                    Some(outcome) => Stage::Done(outcome),
                    None => Stage::PartialNativeFallback,
                },
                Stage::PartialNativeFallback => {
                    if native.text.trim().is_empty() {
                        Stage::Fatal
                    } else {
                        tracing::warn!(
                            chars = native.text.chars().count(),
                            "Every OCR path failed, keeping the sparse native text"
                        );
                        Stage::Done(Outcome {
                            pages: native_pages(&native.text, thresholds::PARTIAL_NATIVE),
                            text: native.text.clone(),
                            confidence: thresholds::PARTIAL_NATIVE,
                            method: ExtractionMethod::Native,
                        })
                    }
                }
                Stage::Fatal => {
                    tracing::error!("No text layer and every OCR path failed");
                    return Err(ExtractionError::AllMethodsFailed);
                }
                Stage::Done(outcome) => {
                    let processing_time_ms = start.elapsed().as_millis() as u64;
                    tracing::info!(
                        method = outcome.method.as_str(),
                        confidence = outcome.confidence,
                        pages = outcome.pages.len(),
                        elapsed_ms = processing_time_ms,
                        "Extraction complete"
                    );
                    return Ok(ExtractionResult {
                        text: outcome.text,
                        confidence: outcome.confidence,
                        method: outcome.method,
                        pages: outcome.pages,
                        processing_time_ms,
                    });
                }
            };
        }
    }

    /// Native text, or an empty layer when the PDF cannot be parsed.
    fn read_native(&self, doc: &RawDocument) -> NativeText {
        match self.native.extract(doc.bytes()) {
            Ok(native) => {
                if native.page_count > 0 {
                    doc.set_page_count(native.page_count);
                }
                native
            }
            Err(e) => {
                tracing::warn!(error = %e, "Native text extraction failed");
                NativeText::default()
            }
        }
    }

    fn run_ocr(&self, doc: &RawDocument, native: &NativeText) -> Option<Outcome> {
        match self.rasterize(doc) {
            Some(images) => {
                let images = self.preprocess_all(images);

                if let Some(pages) = self.try_cloud(|cloud| cloud.annotate_images(&images)) {
                    return Some(merge(pages, native));
                }

                tracing::info!(pages = images.len(), "Running local OCR");
                let pages = run_local_ocr(&images, &*self.local);
                if has_text(&pages) {
                    Some(merge(pages, native))
                } else {
                    tracing::warn!("Local OCR produced no text");
                    None
                }
            }
            None => {
                let page_count = doc.page_count().max(1);
                tracing::info!(page_count, "Trying cloud OCR directly on the PDF");
                self.try_cloud(|cloud| cloud.annotate_pdf(doc.bytes(), page_count))
                    .map(|pages| merge(pages, native))
            }
        }
    }

    /// Rendered pages, or `None` when rasterization is unavailable, failed, or found no page.
    fn rasterize(&self, doc: &RawDocument) -> Option<Vec<PageImage>> {
        let rasterizer = self.rasterizer.as_ref()?;
        let progress = |page: usize, total: usize| {
            tracing::debug!(page, total, "Page rasterized");
        };

        match rasterizer.render_pages(doc.bytes(), self.raster_scale, Some(&progress)) {
            Ok(images) if !images.is_empty() => Some(images),
            Ok(_) => {
                tracing::warn!("Rasterization produced no pages");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rasterization failed");
                None
            }
        }
    }

    /// Clean every page; a page that fails preprocessing goes to OCR as rendered.
    fn preprocess_all(&self, images: Vec<PageImage>) -> Vec<PageImage> {
        images
            .into_iter()
            .map(|image| match self.preprocessor.preprocess(&image) {
                Ok(cleaned) => cleaned,
                Err(e) => {
                    tracing::warn!(page = image.page_number, error = %e, "Preprocessing failed, using raw page");
                    image
                }
            })
            .collect()
    }

    /// Run a cloud call behind the availability and quota gates.
    ///
    /// Every page the API returns is billed, so usage is tracked for any
    /// successful response, even one without text, and for the pages a
    /// failed call had already processed.
    fn try_cloud<F>(&self, call: F) -> Option<Vec<PageResult>>
    where
        F: FnOnce(&dyn CloudOcrClient) -> Result<Vec<PageResult>, CloudOcrFailure>,
    {
        if !self.cloud.is_available() {
            tracing::info!("Cloud OCR unavailable");
            return None;
        }
        if !self.quota.check_quota_available() {
            return None;
        }

        match call(&*self.cloud) {
            Ok(pages) => {
                self.record_usage(pages.len());
                if has_text(&pages) {
                    Some(pages)
                } else {
                    tracing::warn!("Cloud OCR returned no text");
                    None
                }
            }
            Err(failure) => {
                tracing::warn!(
                    error = %failure.error,
                    billed_pages = failure.billed_pages,
                    "Cloud OCR failed, falling back"
                );
                if failure.billed_pages > 0 {
                    self.record_usage(failure.billed_pages);
                }
                None
            }
        }
    }

    fn record_usage(&self, pages: usize) {
        let pages = u32::try_from(pages).unwrap_or(u32::MAX);
        if let Err(e) = self.quota.track_quota_usage(pages) {
            tracing::warn!(error = %e, "Failed to record cloud OCR usage");
        }
    }
}

/// Fold OCR pages into one outcome, reconciled with the native text layer.
fn merge(pages: Vec<PageResult>, native: &NativeText) -> Outcome {
    let confidence = compute_overall_confidence(&pages);
    let merged = merge_with_native(join_pages(&pages), confidence, &native.text);
    Outcome {
        text: merged.text,
        confidence,
        method: merged.method,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::pipeline::extraction::cloud_ocr::{CloudOcrError, MockCloudOcr};
    use crate::pipeline::extraction::local_ocr::MockOcrEngine;
    use crate::pipeline::extraction::native::MockNativeExtractor;
    use crate::pipeline::extraction::pdfium::MockRasterizer;
    use crate::pipeline::extraction::types::{OcrPageResult, PageMethod};
    use crate::quota::{InMemoryQuotaStore, QuotaLimits, QuotaState};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn quota_with(state: QuotaState) -> Arc<QuotaTracker> {
        Arc::new(
            QuotaTracker::new(
                Box::new(InMemoryQuotaStore::new(state)),
                QuotaLimits {
                    daily: 100,
                    monthly: 1000,
                },
            )
            .with_clock(today),
        )
    }

    fn fresh_quota() -> Arc<QuotaTracker> {
        quota_with(QuotaState::default())
    }

    fn exhausted_quota() -> Arc<QuotaTracker> {
        quota_with(QuotaState {
            daily_count: 100,
            daily_date: "2026-03-14".into(),
            monthly_count: 100,
            monthly_month: "2026-03".into(),
        })
    }

    fn doc() -> RawDocument {
        RawDocument::new(b"%PDF-1.4 mock".to_vec())
    }

    /// Shares mocks with the extractor so tests can inspect call counts.
    struct Shared<T>(Arc<T>);

    impl<T: CloudOcrClient> CloudOcrClient for Shared<T> {
        fn is_available(&self) -> bool {
            self.0.is_available()
        }
        fn annotate_images(&self, pages: &[PageImage]) -> Result<Vec<PageResult>, CloudOcrFailure> {
            self.0.annotate_images(pages)
        }
        fn annotate_pdf(&self, pdf: &[u8], count: usize) -> Result<Vec<PageResult>, CloudOcrFailure> {
            self.0.annotate_pdf(pdf, count)
        }
    }

    struct SharedOcr(Arc<MockOcrEngine>);

    impl OcrEngine for SharedOcr {
        fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
            self.0.ocr_image(image_bytes)
        }
    }

    struct Harness {
        extractor: LegalDocumentExtractor,
        cloud: Arc<MockCloudOcr>,
        local: Arc<MockOcrEngine>,
        quota: Arc<QuotaTracker>,
    }

    fn harness(
        native: MockNativeExtractor,
        rasterizer: Option<MockRasterizer>,
        cloud: MockCloudOcr,
        local: MockOcrEngine,
        quota: Arc<QuotaTracker>,
    ) -> Harness {
        let cloud = Arc::new(cloud);
        let local = Arc::new(local);
        let mut extractor = LegalDocumentExtractor::new(
            Box::new(native),
            Box::new(Shared(cloud.clone())),
            Box::new(SharedOcr(local.clone())),
            quota.clone(),
        );
        if let Some(r) = rasterizer {
            extractor = extractor.with_rasterizer(Box::new(r));
        }
        Harness {
            extractor,
            cloud,
            local,
            quota,
        }
    }

    const OCR_TEXT: &str = "Article 1 Le présent décret entre en vigueur le lendemain de sa publication.";

    #[test]
    fn dense_native_text_is_accepted_without_ocr() {
        let h = harness(
            MockNativeExtractor::new(&"a".repeat(1800), 3),
            Some(MockRasterizer::new(3)),
            MockCloudOcr::new(OCR_TEXT, 98.0),
            MockOcrEngine::new(OCR_TEXT, 90.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Native);
        assert_eq!(result.confidence, 95.0);
        assert_eq!(h.cloud.calls(), 0);
        assert_eq!(h.local.calls(), 0);
    }

    #[test]
    fn density_of_exactly_500_is_not_enough() {
        let h = harness(
            MockNativeExtractor::new(&"a".repeat(1000), 2),
            Some(MockRasterizer::new(2)),
            MockCloudOcr::new(OCR_TEXT, 98.0),
            MockOcrEngine::new(OCR_TEXT, 90.0),
            fresh_quota(),
        );
        let result = h.extractor.extract(&doc()).unwrap();
        assert_ne!(result.method, ExtractionMethod::Native);
        assert_eq!(h.cloud.calls(), 1);
    }

    #[test]
    fn cloud_ocr_success_tracks_pages_against_quota() {
        let h = harness(
            MockNativeExtractor::new("", 3),
            Some(MockRasterizer::new(3)),
            MockCloudOcr::new(OCR_TEXT, 97.0),
            MockOcrEngine::new(OCR_TEXT, 90.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(result.pages.len(), 3);
        assert!(result.pages.iter().all(|p| p.method == PageMethod::Ocr));
        assert!((result.confidence - 97.0).abs() < 0.01);
        assert_eq!(h.local.calls(), 0);

        let usage = h.quota.usage().unwrap();
        assert_eq!(usage.daily_used, 3);
        assert_eq!(usage.monthly_used, 3);
    }

    #[test]
    fn low_confidence_ocr_with_native_text_is_hybrid() {
        let native = "Article 1 texte natif partiel ".repeat(3);
        let h = harness(
            MockNativeExtractor::new(&native, 3),
            Some(MockRasterizer::new(3)),
            MockCloudOcr::new("court", 40.0),
            MockOcrEngine::new(OCR_TEXT, 90.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Hybrid);
        assert_eq!(result.text, native, "OCR text is not 1.5x longer, native kept");
    }

    #[test]
    fn unavailable_cloud_falls_back_to_local_ocr() {
        let h = harness(
            MockNativeExtractor::new("", 2),
            Some(MockRasterizer::new(2)),
            MockCloudOcr::unavailable(),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(h.local.calls(), 2);
        assert_eq!(h.cloud.calls(), 0);
        assert_eq!(h.quota.usage().unwrap().daily_used, 0);
    }

    #[test]
    fn cloud_failure_falls_back_to_local_ocr() {
        let h = harness(
            MockNativeExtractor::new("", 2),
            Some(MockRasterizer::new(2)),
            MockCloudOcr::failing(CloudOcrError::QuotaExceeded("429".into())),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(h.cloud.calls(), 1);
        assert_eq!(h.local.calls(), 2);
        assert_eq!(h.quota.usage().unwrap().daily_used, 0);
    }

    #[test]
    fn partial_cloud_failure_still_counts_billed_pages() {
        let h = harness(
            MockNativeExtractor::new("", 3),
            Some(MockRasterizer::new(3)),
            MockCloudOcr::failing_after(2, CloudOcrError::Http("connection reset".into())),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(h.local.calls(), 3);

        let usage = h.quota.usage().unwrap();
        assert_eq!(usage.daily_used, 2);
        assert_eq!(usage.monthly_used, 2);
    }

    #[test]
    fn exhausted_quota_skips_cloud() {
        let h = harness(
            MockNativeExtractor::new("", 2),
            Some(MockRasterizer::new(2)),
            MockCloudOcr::new(OCR_TEXT, 99.0),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            exhausted_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(h.cloud.calls(), 0);
        assert_eq!(h.local.calls(), 2);
    }

    #[test]
    fn failed_local_page_does_not_stop_the_others() {
        let h = harness(
            MockNativeExtractor::new("", 3),
            Some(MockRasterizer::new(3)),
            MockCloudOcr::unavailable(),
            MockOcrEngine::new(OCR_TEXT, 80.0).with_failures(&[2]),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.pages.len(), 3);
        assert!(result.pages[1].text.is_empty());
        assert_eq!(result.pages[1].confidence, 0.0);
        assert!((result.confidence - 80.0).abs() < 0.01);
    }

    struct RejectingPreprocessor;

    impl ImagePreprocessor for RejectingPreprocessor {
        fn preprocess(&self, _page: &PageImage) -> Result<PageImage, ExtractionError> {
            Err(ExtractionError::ImageProcessing("cannot decode".into()))
        }
    }

    #[test]
    fn preprocessing_failure_sends_the_raw_page_to_ocr() {
        let mut h = harness(
            MockNativeExtractor::new("", 2),
            Some(MockRasterizer::new(2)),
            MockCloudOcr::unavailable(),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );
        h.extractor = h.extractor.with_preprocessor(Box::new(RejectingPreprocessor));

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(h.local.calls(), 2);
        assert!(result.text.contains("Article 1"));
    }

    #[test]
    fn rasterization_failure_uses_direct_pdf_cloud_path() {
        let h = harness(
            MockNativeExtractor::new("", 7),
            Some(MockRasterizer::failing()),
            MockCloudOcr::new(OCR_TEXT, 96.0),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(result.pages.len(), 7);
        assert_eq!(h.local.calls(), 0);
        assert_eq!(h.quota.usage().unwrap().daily_used, 7);
    }

    #[test]
    fn zero_rendered_pages_uses_direct_pdf_cloud_path() {
        let h = harness(
            MockNativeExtractor::failing("broken"),
            Some(MockRasterizer::new(0)),
            MockCloudOcr::new(OCR_TEXT, 96.0),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        // Unknown page count: at least one page is requested.
        assert_eq!(result.pages.len(), 1);
        assert_eq!(h.cloud.calls(), 1);
    }

    #[test]
    fn missing_rasterizer_uses_direct_pdf_cloud_path() {
        let h = harness(
            MockNativeExtractor::new("", 2),
            None,
            MockCloudOcr::new(OCR_TEXT, 96.0),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );
        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(h.cloud.calls(), 1);
    }

    #[test]
    fn all_ocr_failed_keeps_sparse_native_text_at_30() {
        let h = harness(
            MockNativeExtractor::new("Décret n° 2024-1 du 2 janvier 2024", 3),
            Some(MockRasterizer::failing()),
            MockCloudOcr::unavailable(),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );

        let result = h.extractor.extract(&doc()).unwrap();
        assert_eq!(result.method, ExtractionMethod::Native);
        assert_eq!(result.confidence, 30.0);
        assert_eq!(result.text, "Décret n° 2024-1 du 2 janvier 2024");
    }

    #[test]
    fn no_text_anywhere_is_fatal() {
        let h = harness(
            MockNativeExtractor::new("", 2),
            Some(MockRasterizer::new(2)),
            MockCloudOcr::failing(CloudOcrError::PermissionDenied("403".into())),
            MockOcrEngine::new("", 0.0),
            fresh_quota(),
        );

        let err = h.extractor.extract(&doc()).unwrap_err();
        assert!(matches!(err, ExtractionError::AllMethodsFailed));
    }

    #[test]
    fn unparseable_pdf_with_no_ocr_is_fatal() {
        let h = harness(
            MockNativeExtractor::failing("not a pdf"),
            None,
            MockCloudOcr::unavailable(),
            MockOcrEngine::new(OCR_TEXT, 85.0),
            fresh_quota(),
        );
        assert!(matches!(
            h.extractor.extract(&doc()),
            Err(ExtractionError::AllMethodsFailed)
        ));
    }
}
