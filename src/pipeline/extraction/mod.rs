pub mod types;
pub mod confidence;
pub mod preprocess;
pub mod native;
pub mod local_ocr;
pub mod google_auth;
pub mod cloud_ocr;
pub mod pdfium;
pub mod orchestrator;

pub use types::*;
pub use confidence::*;
pub use preprocess::*;
pub use native::*;
pub use local_ocr::*;
pub use cloud_ocr::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No text could be extracted: native text layer empty and every OCR path failed")]
    AllMethodsFailed,

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    Rasterization { page: usize, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),
}
