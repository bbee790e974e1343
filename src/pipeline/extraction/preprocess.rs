//! Scan cleanup before OCR.
//!
//! Fixed order, each step a pure grayscale transform:
//! grayscale → histogram stretch → sharpen → median denoise → Otsu binarize.
//! Reordering changes OCR output (denoising after binarization erases
//! diacritics, sharpening after the median brings the speckle back).

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, RgbImage};
use tracing::debug;

use super::types::{ImagePreprocessor, PageImage};
use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// PNG signature length; anything shorter cannot be an image.
const MIN_IMAGE_BYTES: usize = 8;

/// Fraction of pixels ignored at each end of the histogram when stretching.
const STRETCH_CLIP: f64 = 0.005;

// ═══════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════

/// Default preprocessor for rendered legal scans.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanPreprocessor;

impl ImagePreprocessor for ScanPreprocessor {
    fn preprocess(&self, page: &PageImage) -> Result<PageImage, ExtractionError> {
        validate_image_bytes(&page.png_bytes)?;

        let decoded = image::load_from_memory(&page.png_bytes)
            .map_err(|e| ExtractionError::ImageProcessing(format!("Cannot decode page: {e}")))?;

        let gray = rgb_to_gray(&decoded.to_rgb8());
        let stretched = stretch_histogram(&gray);
        let sharpened = sharpen(&stretched);
        let denoised = median_filter(&sharpened);
        let threshold = otsu_threshold(&denoised);
        let binary = binarize(&denoised, threshold);

        let png_bytes = encode_png(&binary)?;
        debug!(
            page = page.page_number,
            threshold,
            input_size = page.png_bytes.len(),
            output_size = png_bytes.len(),
            "Page preprocessed"
        );

        Ok(PageImage {
            page_number: page.page_number,
            png_bytes,
            width: binary.width(),
            height: binary.height(),
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Pixel transforms (reusable)
// ═══════════════════════════════════════════════════════════

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (x, y, p) in rgb.enumerate_pixels() {
        let luma = 0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }
    gray
}

/// Stretch intensities so the darkest and brightest (clipped) values map to 0 and 255.
///
/// A flat image has no range to stretch and is returned unchanged.
pub fn stretch_histogram(img: &GrayImage) -> GrayImage {
    let histogram = histogram(img);
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return img.clone();
    }
    let clip = (total as f64 * STRETCH_CLIP) as u64;

    let low = percentile_from_start(&histogram, clip);
    let high = percentile_from_end(&histogram, clip);
    if high <= low {
        return img.clone();
    }

    let range = (high - low) as f32;
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, p) in img.enumerate_pixels() {
        let v = p.0[0].clamp(low, high);
        let scaled = ((v - low) as f32 * 255.0 / range).round();
        out.put_pixel(x, y, Luma([scaled as u8]));
    }
    out
}

/// 3x3 sharpening kernel `[0,-1,0; -1,5,-1; 0,-1,0]`. Border pixels are copied.
pub fn sharpen(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = img.get_pixel(x, y).0[0] as i32;
            let neighbours = img.get_pixel(x, y - 1).0[0] as i32
                + img.get_pixel(x, y + 1).0[0] as i32
                + img.get_pixel(x - 1, y).0[0] as i32
                + img.get_pixel(x + 1, y).0[0] as i32;
            let v = (5 * center - neighbours).clamp(0, 255);
            out.put_pixel(x, y, Luma([v as u8]));
        }
    }
    out
}

/// 3x3 median filter. Removes salt-and-pepper scan noise. Border pixels are copied.
pub fn median_filter(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }

    let mut window = [0u8; 9];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut i = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    window[i] = img.get_pixel(x + dx - 1, y + dy - 1).0[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Otsu's threshold: the intensity maximizing between-class variance.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let histogram = histogram(img);
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 127;
    }

    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0.0f64;
    let mut best_variance = 0.0f64;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += t as f64 * count as f64;
        let mean_bg = background_sum / background_weight as f64;
        let mean_fg = (weighted_total - background_sum) / foreground_weight as f64;
        let variance =
            background_weight as f64 * foreground_weight as f64 * (mean_bg - mean_fg).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }
    best_threshold
}

/// Map pixels above `threshold` to white, the rest to black.
///
/// Output is always dark text on a light page: when most pixels end up black
/// (white-on-black scans), the result is inverted.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    let mut dark = 0u64;
    for (x, y, p) in img.enumerate_pixels() {
        let v = if p.0[0] > threshold { 255 } else { 0 };
        if v == 0 {
            dark += 1;
        }
        out.put_pixel(x, y, Luma([v]));
    }

    let total = img.width() as u64 * img.height() as u64;
    if dark * 2 > total {
        for p in out.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════
// Pure helper functions
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageProcessing(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

fn histogram(img: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for p in img.pixels() {
        bins[p.0[0] as usize] += 1;
    }
    bins
}

fn percentile_from_start(histogram: &[u64; 256], skip: u64) -> u8 {
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > skip {
            return value as u8;
        }
    }
    255
}

fn percentile_from_end(histogram: &[u64; 256], skip: u64) -> u8 {
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > skip {
            return value as u8;
        }
    }
    0
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn gray_from_fn(w: u32, h: u32, f: impl Fn(u32, u32) -> u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([f(x, y)]))
    }

    fn page_from_rgb(img: RgbImage) -> PageImage {
        let (width, height) = (img.width(), img.height());
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        PageImage {
            page_number: 1,
            png_bytes: cursor.into_inner(),
            width,
            height,
        }
    }

    // ── rgb_to_gray ──

    #[test]
    fn gray_uses_bt601_weights() {
        let rgb = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(rgb_to_gray(&rgb).get_pixel(0, 0).0[0], 76);
        let white = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        assert_eq!(rgb_to_gray(&white).get_pixel(0, 0).0[0], 255);
    }

    // ── stretch_histogram ──

    #[test]
    fn stretch_expands_low_contrast_range() {
        let img = gray_from_fn(100, 1, |x, _| if x < 50 { 100 } else { 150 });
        let out = stretch_histogram(&img);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(99, 0).0[0], 255);
    }

    #[test]
    fn stretch_leaves_flat_image_unchanged() {
        let img = gray_from_fn(10, 10, |_, _| 200);
        assert_eq!(stretch_histogram(&img), img);
    }

    // ── sharpen ──

    #[test]
    fn sharpen_keeps_flat_regions() {
        let img = gray_from_fn(5, 5, |_, _| 128);
        assert_eq!(sharpen(&img), img);
    }

    #[test]
    fn sharpen_deepens_isolated_dark_dot() {
        let img = gray_from_fn(3, 3, |x, y| if x == 1 && y == 1 { 100 } else { 200 });
        assert_eq!(sharpen(&img).get_pixel(1, 1).0[0], 0);
    }

    // ── median_filter ──

    #[test]
    fn median_removes_single_speck() {
        let img = gray_from_fn(5, 5, |x, y| if x == 2 && y == 2 { 0 } else { 255 });
        assert_eq!(median_filter(&img).get_pixel(2, 2).0[0], 255);
    }

    #[test]
    fn tiny_images_pass_through_filters() {
        let img = gray_from_fn(2, 2, |x, _| (x * 100) as u8);
        assert_eq!(median_filter(&img), img);
        assert_eq!(sharpen(&img), img);
    }

    // ── otsu + binarize ──

    #[test]
    fn otsu_splits_bimodal_image() {
        let img = gray_from_fn(10, 10, |x, _| if x < 3 { 30 } else { 220 });
        let t = otsu_threshold(&img);
        assert!((30..220).contains(&t), "threshold {t} not between modes");
    }

    #[test]
    fn binarize_produces_dark_text_on_white() {
        let img = gray_from_fn(10, 10, |x, _| if x < 3 { 30 } else { 220 });
        let out = binarize(&img, otsu_threshold(&img));
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(9, 0).0[0], 255);
    }

    #[test]
    fn binarize_inverts_white_on_black_scans() {
        let img = gray_from_fn(10, 10, |x, _| if x < 3 { 220 } else { 30 });
        let out = binarize(&img, 100);
        assert_eq!(out.get_pixel(0, 0).0[0], 0, "text becomes black");
        assert_eq!(out.get_pixel(9, 0).0[0], 255, "background becomes white");
    }

    // ── full pipeline ──

    #[test]
    fn preprocess_outputs_binary_png_of_same_size() {
        let rgb = RgbImage::from_fn(20, 10, |x, _| {
            if (5..8).contains(&x) {
                Rgb([40, 40, 40])
            } else {
                Rgb([230, 225, 210])
            }
        });
        let page = page_from_rgb(rgb);
        let out = ScanPreprocessor.preprocess(&page).unwrap();

        assert_eq!((out.width, out.height), (20, 10));
        assert_eq!(out.page_number, 1);
        let decoded = image::load_from_memory(&out.png_bytes).unwrap().to_luma8();
        assert!(decoded.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn preprocess_rejects_garbage() {
        let page = PageImage {
            page_number: 2,
            png_bytes: vec![1, 2, 3],
            width: 1,
            height: 1,
        };
        assert!(ScanPreprocessor.preprocess(&page).is_err());

        let page = PageImage {
            png_bytes: vec![0u8; 64],
            ..page
        };
        assert!(ScanPreprocessor.preprocess(&page).is_err());
    }
}
