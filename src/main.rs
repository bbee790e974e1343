use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use juritext_lib::config::{self, PipelineConfig};
use juritext_lib::pipeline::extraction::pdfium::PdfiumRasterizer;
use juritext_lib::pipeline::extraction::{
    default_engine, GoogleVisionClient, LegalDocumentExtractor, PdfTextExtractor,
};
use juritext_lib::pipeline::processor::{DocumentProcessor, ExtractedDocument};
use juritext_lib::quota::{JsonFileQuotaStore, QuotaLimits, QuotaTracker};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Metadata and structure as pretty JSON
    Json,
    /// Standalone HTML fragment
    Html,
    /// Normalized plain text
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "juritext", version, about = "Extract and structure French legal texts from PDF")]
struct Args {
    /// PDF file to process
    pdf: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write intermediate artifacts under this directory
    #[arg(long, env = "JURITEXT_DUMP_DIR")]
    dump_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    juritext_lib::init_tracing();
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let processor = match build_processor(&args) {
        Ok(processor) => processor,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(2);
        }
    };

    match processor.process_file(&args.pdf) {
        Ok(document) => {
            println!("{}", render(&document, args.format));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(path = %args.pdf.display(), error = %e, "Processing failed");
            ExitCode::FAILURE
        }
    }
}

fn build_processor(args: &Args) -> Result<DocumentProcessor, Box<dyn std::error::Error>> {
    let config = PipelineConfig::from_env();

    let quota = Arc::new(QuotaTracker::new(
        Box::new(JsonFileQuotaStore::new(config.quota_file.clone())),
        QuotaLimits {
            daily: config.daily_limit,
            monthly: config.monthly_limit,
        },
    ));
    let cloud = GoogleVisionClient::from_config(&config)?;

    let mut extractor = LegalDocumentExtractor::new(
        Box::new(PdfTextExtractor),
        Box::new(cloud),
        default_engine(),
        quota,
    )
    .with_raster_scale(config.raster_scale);

    match PdfiumRasterizer::new() {
        Ok(rasterizer) => extractor = extractor.with_rasterizer(Box::new(rasterizer)),
        Err(e) => tracing::warn!(error = %e, "PDFium unavailable, scanned pages go to cloud OCR as PDF"),
    }

    let mut processor = DocumentProcessor::new(extractor);
    if let Some(dir) = &args.dump_dir {
        processor = processor.with_dump_dir(dir);
    }
    Ok(processor)
}

fn render(document: &ExtractedDocument, format: OutputFormat) -> &str {
    match format {
        OutputFormat::Json => &document.json,
        OutputFormat::Html => &document.html,
        OutputFormat::Text => &document.cleaned_text,
    }
}
