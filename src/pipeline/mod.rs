pub mod extraction;
pub mod structuring;
pub mod processor; // PDF → ExtractedDocument
pub mod diagnostic; // Intermediate artifact dump (JURITEXT_DUMP_DIR)
