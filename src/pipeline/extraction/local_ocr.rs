use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::{OcrEngine, OcrPageResult, PageImage, PageResult};
use super::ExtractionError;

/// Language(s) requested from the local engine when the traineddata exists.
pub const DEFAULT_OCR_LANGUAGES: &str = "fra+eng";

/// Well-known tessdata locations, checked after `TESSDATA_PREFIX`.
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

/// OCR every page in order with the local engine.
///
/// A page the engine cannot read is logged and recorded as an empty
/// zero-confidence page; the remaining pages are still processed.
pub fn run_local_ocr(pages: &[PageImage], engine: &dyn OcrEngine) -> Vec<PageResult> {
    pages
        .iter()
        .map(|page| match engine.ocr_image(&page.png_bytes) {
            Ok(result) => {
                tracing::debug!(
                    page = page.page_number,
                    chars = result.text.len(),
                    confidence = result.confidence,
                    "Local OCR page done"
                );
                PageResult::ocr(page.page_number, result.text, result.confidence)
            }
            Err(e) => {
                tracing::warn!(page = page.page_number, error = %e, "Local OCR failed on page");
                PageResult::failed(page.page_number)
            }
        })
        .collect()
}

/// Locate a tessdata directory: `prefix` (from `TESSDATA_PREFIX`) first, then system paths.
///
/// A directory qualifies when it holds `eng.traineddata`.
pub fn find_tessdata_dir(prefix: Option<&Path>) -> Option<PathBuf> {
    let candidates = prefix
        .into_iter()
        .flat_map(|p| [p.to_path_buf(), p.join("tessdata")])
        .chain(SYSTEM_TESSDATA_DIRS.iter().map(PathBuf::from));

    candidates
        .into_iter()
        .find(|dir| dir.join("eng.traineddata").exists())
}

/// Languages to request given what is installed in `tessdata_dir`.
pub fn available_languages(tessdata_dir: &Path) -> &'static str {
    if tessdata_dir.join("fra.traineddata").exists() {
        DEFAULT_OCR_LANGUAGES
    } else {
        tracing::warn!(
            dir = %tessdata_dir.display(),
            "French traineddata not found, local OCR falls back to English"
        );
        "eng"
    }
}

/// Best local engine for this build: Tesseract with the `ocr` feature,
/// otherwise an engine that fails every page.
pub fn default_engine() -> Box<dyn OcrEngine + Send + Sync> {
    #[cfg(feature = "ocr")]
    {
        let prefix = std::env::var_os("TESSDATA_PREFIX").map(PathBuf::from);
        match find_tessdata_dir(prefix.as_deref()) {
            Some(dir) => match BundledTesseract::new(&dir) {
                Ok(engine) => return Box::new(engine),
                Err(e) => tracing::warn!(error = %e, "Tesseract unusable"),
            },
            None => tracing::warn!("No tessdata directory found, local OCR disabled"),
        }
    }

    Box::new(UnavailableOcrEngine)
}

/// Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: PathBuf,
    languages: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    pub fn new(tessdata_dir: &Path) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(ExtractionError::OcrInit(format!(
                "eng.traineddata not found in {}",
                tessdata_dir.display()
            )));
        }
        let languages = available_languages(tessdata_dir).to_string();
        tracing::info!(dir = %tessdata_dir.display(), languages = %languages, "Tesseract ready");

        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            languages,
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let tessdata = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?;

        let mut tess = tesseract::Tesseract::new(Some(tessdata), Some(&self.languages))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;
        let confidence = tess.mean_text_conf().clamp(0, 100) as f32;

        Ok(OcrPageResult { text, confidence })
    }
}

/// Stand-in when no local engine is compiled in or installed.
pub struct UnavailableOcrEngine;

impl OcrEngine for UnavailableOcrEngine {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        Err(ExtractionError::OcrInit(
            "no local OCR engine (build with --features ocr and install tessdata)".into(),
        ))
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    text: String,
    confidence: f32,
    /// 1-based call numbers that fail.
    failing_calls: Vec<usize>,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            failing_calls: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail on the given calls (1-based), succeed on the others.
    pub fn with_failures(mut self, calls: &[usize]) -> Self {
        self.failing_calls = calls.to_vec();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, ExtractionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_calls.contains(&call) {
            return Err(ExtractionError::OcrProcessing(format!("mock failure on call {call}")));
        }
        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::pdfium::blank_png;

    fn pages(n: usize) -> Vec<PageImage> {
        (1..=n)
            .map(|page_number| PageImage {
                page_number,
                png_bytes: blank_png(1, 1),
                width: 1,
                height: 1,
            })
            .collect()
    }

    #[test]
    fn ocr_runs_every_page_in_order() {
        let engine = MockOcrEngine::new("Article premier", 88.0);
        let results = run_local_ocr(&pages(3), &engine);

        assert_eq!(results.len(), 3);
        assert_eq!(engine.calls(), 3);
        assert!(results.iter().enumerate().all(|(i, p)| p.page_number == i + 1));
        assert!(results.iter().all(|p| p.text == "Article premier"));
    }

    #[test]
    fn failed_page_is_recorded_empty_and_processing_continues() {
        let engine = MockOcrEngine::new("texte", 80.0).with_failures(&[2]);
        let results = run_local_ocr(&pages(3), &engine);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "texte");
        assert!(results[1].text.is_empty());
        assert_eq!(results[1].confidence, 0.0);
        assert_eq!(results[2].text, "texte");
    }

    #[test]
    fn unavailable_engine_yields_empty_pages() {
        let results = run_local_ocr(&pages(2), &UnavailableOcrEngine);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|p| p.text.is_empty()));
    }

    #[test]
    fn tessdata_prefix_is_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"").unwrap();
        assert_eq!(find_tessdata_dir(Some(dir.path())), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn tessdata_prefix_parent_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tessdata")).unwrap();
        std::fs::write(dir.path().join("tessdata/eng.traineddata"), b"").unwrap();
        assert_eq!(
            find_tessdata_dir(Some(dir.path())),
            Some(dir.path().join("tessdata"))
        );
    }

    #[test]
    fn french_is_requested_when_installed() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(available_languages(dir.path()), "eng");
        std::fs::write(dir.path().join("fra.traineddata"), b"").unwrap();
        assert_eq!(available_languages(dir.path()), "fra+eng");
    }
}
