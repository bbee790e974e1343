//! PDF page rasterization via Google PDFium.
//!
//! Renders every page of a PDF to a PNG image for OCR when the text layer is
//! unusable (scanned gazettes, image-only prints).
//!
//! `PdfiumRasterizer` is stateless (`Send + Sync`). Each operation creates
//! a fresh `Pdfium` instance because the upstream type is `!Send`.
//! The OS caches `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use std::io::Cursor;
use std::path::PathBuf;

use image::{GenericImageView, ImageOutputFormat};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::{PageImage, PageRasterizer, ProgressFn};
use super::ExtractionError;

/// Maximum dimension (width or height) for rendered page images.
/// Prevents OOM on extremely large pages or absurd scale settings.
const MAX_DIMENSION_PX: u32 = 4096;

/// Renders PDF pages to PNG images using Google PDFium.
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Create a new rasterizer, verifying the PDFium library is loadable.
    pub fn new() -> Result<Self, ExtractionError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Load the PDFium dynamic library.
///
/// Tries `PDFIUM_DYNAMIC_LIB_PATH`, then the executable's directory and its
/// `lib/` subdirectory, then the system search path.
pub fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    for candidate in library_candidates() {
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                debug!(path = %candidate.display(), "PDFium loaded");
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => debug!(path = %candidate.display(), error = %e, "PDFium candidate rejected"),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            rasterization_error(
                0,
                format!("PDFium library not found, set PDFIUM_DYNAMIC_LIB_PATH: {e}"),
            )
        })
}

fn library_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = std::env::var_os("PDFIUM_DYNAMIC_LIB_PATH") {
        candidates.push(PathBuf::from(path));
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(PathBuf::from)) {
        for dir in [exe_dir.clone(), exe_dir.join("lib")] {
            candidates.push(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
                dir.to_string_lossy().as_ref(),
            )));
        }
    }
    candidates
}

fn rasterization_error(page: usize, reason: String) -> ExtractionError {
    ExtractionError::Rasterization { page, reason }
}

fn open_document<'a>(pdfium: &'a Pdfium, pdf_bytes: &'a [u8]) -> Result<PdfDocument<'a>, ExtractionError> {
    pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| rasterization_error(0, format!("PDFium could not open the document: {e}")))
}

/// Pixel size of a page rendered at `scale`, never zero, with the longest
/// side capped at [`MAX_DIMENSION_PX`] (aspect ratio kept).
pub fn compute_render_dimensions(width_points: f32, height_points: f32, scale: f32) -> (u32, u32) {
    let width = (width_points * scale).max(1.0);
    let height = (height_points * scale).max(1.0);
    let shrink = (MAX_DIMENSION_PX as f32 / width.max(height)).min(1.0);

    let fit = |side: f32| ((side * shrink) as u32).clamp(1, MAX_DIMENSION_PX);
    (fit(width), fit(height))
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_pages(
        &self,
        pdf_bytes: &[u8],
        scale: f32,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<PageImage>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = open_document(&pdfium, pdf_bytes)?;

        let pages = document.pages();
        let total = pages.len() as usize;
        let mut images = Vec::with_capacity(total);

        for (idx, page) in pages.iter().enumerate() {
            let page_number = idx + 1;
            let (target_w, target_h) =
                compute_render_dimensions(page.width().value, page.height().value, scale);

            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| rasterization_error(page_number, format!("Rendering failed: {e}")))?;

            let dynamic_image = bitmap.as_image();
            let (width, height) = dynamic_image.dimensions();
            let mut cursor = Cursor::new(Vec::new());
            dynamic_image
                .write_to(&mut cursor, ImageOutputFormat::Png)
                .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;

            // Release the page's native handles before rendering the next one.
            drop(bitmap);
            drop(page);

            let png_bytes = cursor.into_inner();
            debug!(
                page = page_number,
                width,
                height,
                png_size = png_bytes.len(),
                "Rendered PDF page to PNG"
            );

            images.push(PageImage {
                page_number,
                png_bytes,
                width,
                height,
            });

            if let Some(report) = progress {
                report(page_number, total);
            }
        }

        if images.len() != total {
            warn!(rendered = images.len(), total, "Page count mismatch after rendering");
        }

        Ok(images)
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Mock rasterizer returning a blank 1x1 PNG for each page, or a configured failure.
pub struct MockRasterizer {
    page_count: usize,
    fail: bool,
}

impl MockRasterizer {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            page_count: 0,
            fail: true,
        }
    }
}

impl PageRasterizer for MockRasterizer {
    fn render_pages(
        &self,
        _pdf_bytes: &[u8],
        _scale: f32,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<PageImage>, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::Rasterization {
                page: 0,
                reason: "mock rasterizer failure".into(),
            });
        }

        let images = (1..=self.page_count)
            .map(|page_number| {
                if let Some(report) = progress {
                    report(page_number, self.page_count);
                }
                PageImage {
                    page_number,
                    png_bytes: blank_png(1, 1),
                    width: 1,
                    height: 1,
                }
            })
            .collect();
        Ok(images)
    }
}

/// Blank white page of the given size, PNG-encoded. Used by mocks and tests.
pub fn blank_png(width: u32, height: u32) -> Vec<u8> {
    let page = image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
        width.max(1),
        height.max(1),
        image::Luma([255u8]),
    ));
    let mut cursor = Cursor::new(Vec::new());
    match page.write_to(&mut cursor, ImageOutputFormat::Png) {
        Ok(()) => cursor.into_inner(),
        Err(_) => Vec::new(),
    }
}
