//! Document processing driver.
//!
//! Single entry point for the whole pipeline:
//! extract → normalize → {metadata, structure} → render.
//!
//! Extraction strategies are injected through `LegalDocumentExtractor`, so
//! the processor is testable end to end with mock engines.

use std::path::{Path, PathBuf};
use std::thread;

use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::diagnostic;
use crate::pipeline::extraction::{
    ExtractionError, ExtractionMethod, ExtractionResult, LegalDocumentExtractor, RawDocument,
};
use crate::pipeline::structuring::{
    build_structure, extract_metadata, normalize, render_html, render_json, DocumentMetadata,
    DocumentStructure,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("JSON rendering failed: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Metadata worker panicked")]
    WorkerPanicked,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Extraction stage summary.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub method: ExtractionMethod,
    pub confidence: f32,
    pub page_count: usize,
    pub processing_time_ms: u64,
}

impl From<&ExtractionResult> for ExtractionSummary {
    fn from(result: &ExtractionResult) -> Self {
        Self {
            method: result.method,
            confidence: result.confidence,
            page_count: result.pages.len(),
            processing_time_ms: result.processing_time_ms,
        }
    }
}

/// Final artifact for one document, ready for external persistence.
///
/// `json` and `html` are renderings of `metadata` and `structure` only.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub raw_text: String,
    pub cleaned_text: String,
    pub metadata: DocumentMetadata,
    pub structure: DocumentStructure,
    pub json: String,
    pub html: String,
    pub extraction: ExtractionSummary,
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

pub struct DocumentProcessor {
    extractor: LegalDocumentExtractor,
    dump_root: Option<PathBuf>,
}

impl DocumentProcessor {
    /// Dumps follow `JURITEXT_DUMP_DIR`; see [`Self::with_dump_dir`].
    pub fn new(extractor: LegalDocumentExtractor) -> Self {
        Self {
            extractor,
            dump_root: diagnostic::resolve_base_dir(),
        }
    }

    /// Write intermediate artifacts under `dir` for every processed document.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_root = Some(dir.into());
        self
    }

    /// Read a PDF from disk and process it.
    pub fn process_file(&self, path: &Path) -> Result<ExtractedDocument, ProcessingError> {
        let doc = RawDocument::from_path(path)?;
        tracing::info!(path = %path.display(), size = doc.bytes().len(), "Processing document");
        self.process(&doc)
    }

    /// Full pipeline over PDF bytes.
    ///
    /// Only fails when no text could be obtained at all; every intermediate
    /// fault is absorbed by the extractor's fallbacks.
    pub fn process(&self, doc: &RawDocument) -> Result<ExtractedDocument, ProcessingError> {
        let run_id = Uuid::new_v4();
        let dump = self
            .dump_root
            .as_deref()
            .and_then(|root| diagnostic::dump_dir_for(root, &run_id));

        if let Some(dir) = &dump {
            diagnostic::dump_binary(dir, "00-source.pdf", doc.bytes());
            diagnostic::dump_json(
                dir,
                "00-source-info.json",
                &serde_json::json!({
                    "run_id": run_id,
                    "size_bytes": doc.bytes().len(),
                }),
            );
        }

        let extraction = self.extractor.extract(doc)?;
        if let Some(dir) = &dump {
            diagnostic::dump_json(dir, "01-extraction-result.json", &extraction);
        }

        let summary = ExtractionSummary::from(&extraction);
        let document = structure_text(extraction.text, summary)?;

        if let Some(dir) = &dump {
            diagnostic::dump_text(dir, "02-raw-text.txt", &document.raw_text);
            diagnostic::dump_text(dir, "03-cleaned-text.txt", &document.cleaned_text);
            diagnostic::dump_json(dir, "04-metadata.json", &document.metadata);
            diagnostic::dump_json(dir, "05-structure.json", &document.structure);
            diagnostic::dump_text(dir, "06-document.html", &document.html);
        }

        tracing::info!(
            %run_id,
            method = document.extraction.method.as_str(),
            confidence = document.extraction.confidence,
            sections = document.structure.sections.len(),
            articles = document.structure.articles.len(),
            "Document processed"
        );
        Ok(document)
    }
}

/// Normalize extracted text, then derive metadata and structure and render them.
///
/// Metadata and structure only read the cleaned text, so they run side by side.
pub fn structure_text(
    raw_text: String,
    extraction: ExtractionSummary,
) -> Result<ExtractedDocument, ProcessingError> {
    let cleaned_text = normalize(&raw_text);

    let (metadata, structure) = thread::scope(|scope| {
        let metadata = scope.spawn(|| extract_metadata(&cleaned_text));
        let structure = build_structure(&cleaned_text);
        (metadata.join(), structure)
    });
    let metadata = metadata.map_err(|_| ProcessingError::WorkerPanicked)?;

    let json = render_json(&metadata, &structure)?;
    let html = render_html(&metadata, &structure);

    Ok(ExtractedDocument {
        raw_text,
        cleaned_text,
        metadata,
        structure,
        json,
        html,
        extraction,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
