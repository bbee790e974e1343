//! Paid OCR through the Google Cloud Vision API.
//!
//! Two entry points: rendered page images (`images:annotate`, one request per
//! page) and the raw PDF (`files:annotate`, at most 5 pages per request).
//! Quota gating and usage tracking stay with the orchestrator.

use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::google_auth::{ServiceAccountKey, TokenProvider};
use super::types::{CloudOcrClient, PageImage, PageResult};
use crate::config::PipelineConfig;

const VISION_BASE_URL: &str = "https://vision.googleapis.com/v1";

/// `files:annotate` accepts at most this many pages per request.
pub const PDF_BATCH_PAGES: usize = 5;

/// Used when a response carries no page confidence.
pub const DEFAULT_CLOUD_CONFIDENCE: f32 = 95.0;

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Language hints sent with every request.
const LANGUAGE_HINTS: &[&str] = &["fr"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CloudOcrError {
    #[error("Cloud OCR unavailable: {0}")]
    Unavailable(String),

    #[error("Cloud OCR quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Cloud OCR permission denied: {0}")]
    PermissionDenied(String),

    #[error("Cloud OCR rejected the image: {0}")]
    InvalidImage(String),

    #[error("Cloud OCR authentication failed: {0}")]
    Auth(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Cloud OCR API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl CloudOcrError {
    /// Errors that will repeat for every further page of the same request.
    pub fn is_fatal_for_batch(&self) -> bool {
        !matches!(self, Self::InvalidImage(_))
    }
}

/// A cloud call that stopped partway. Pages processed before the failure
/// are billed even though their results are dropped.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error} ({billed_pages} pages billed before the failure)")]
pub struct CloudOcrFailure {
    pub error: CloudOcrError,
    pub billed_pages: usize,
}

impl From<CloudOcrError> for CloudOcrFailure {
    fn from(error: CloudOcrError) -> Self {
        Self {
            error,
            billed_pages: 0,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct BatchImageResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
struct BatchFileResponse {
    #[serde(default)]
    responses: Vec<AnnotateFileResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateFileResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
    #[serde(default)]
    total_pages: Option<usize>,
    #[serde(default)]
    error: Option<ApiStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    context: Option<ImageContext>,
    #[serde(default)]
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<AnnotatedPage>,
}

#[derive(Debug, Deserialize)]
struct AnnotatedPage {
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    #[serde(default)]
    page_number: Option<usize>,
}

/// `google.rpc.Status` as embedded in responses and error bodies.
#[derive(Debug, Default, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ApiStatus,
}

// ═══════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════

/// Sends one JSON request to a Vision endpoint and returns the JSON reply.
///
/// Non-2xx replies are mapped to typed errors by the implementation.
pub trait VisionTransport {
    fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, CloudOcrError>;
}

/// Authenticated HTTPS transport to the public Vision API.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
    auth: TokenProvider,
    project_id: Option<String>,
}

impl VisionTransport for HttpTransport {
    fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, CloudOcrError> {
        let token = self.auth.access_token()?;
        let url = format!("{VISION_BASE_URL}/{endpoint}");

        let mut request = self.http.post(&url).bearer_auth(token).json(body);
        if let Some(project) = &self.project_id {
            request = request.header("x-goog-user-project", project);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                CloudOcrError::Http(format!("Request timed out after {REQUEST_TIMEOUT_SECS}s"))
            } else {
                CloudOcrError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(map_http_error(status.as_u16(), &body));
        }
        response
            .json()
            .map_err(|e| CloudOcrError::ResponseParsing(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════

/// Google Cloud Vision `DOCUMENT_TEXT_DETECTION` client.
///
/// Without a transport the client is unavailable.
pub struct GoogleVisionClient {
    transport: Option<Box<dyn VisionTransport + Send + Sync>>,
}

impl GoogleVisionClient {
    /// Build from pipeline configuration.
    ///
    /// Missing or unusable credentials do not fail construction; the client
    /// reports itself unavailable and the pipeline falls back to local OCR.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, CloudOcrError> {
        if !config.cloud_ocr_enabled {
            return Ok(Self { transport: None });
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CloudOcrError::Http(format!("Failed to create HTTP client: {e}")))?;

        let transport = load_token_provider(config, http.clone()).map(|auth| {
            let project_id = config
                .project_id
                .clone()
                .or_else(|| auth.project_id().map(str::to_string));
            Box::new(HttpTransport {
                http,
                auth,
                project_id,
            }) as Box<dyn VisionTransport + Send + Sync>
        });

        Ok(Self { transport })
    }

    /// Client over an explicit transport, always available.
    pub fn with_transport(transport: Box<dyn VisionTransport + Send + Sync>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    fn post<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T, CloudOcrError> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            CloudOcrError::Unavailable("cloud OCR disabled or credentials missing".into())
        })?;
        let reply = transport.post_json(endpoint, body)?;
        serde_json::from_value(reply).map_err(|e| CloudOcrError::ResponseParsing(e.to_string()))
    }

    fn annotate_image(&self, page: &PageImage) -> Result<PageResult, CloudOcrError> {
        let parsed: BatchImageResponse = self.post("images:annotate", &image_request(&page.png_bytes))?;
        let response = parsed.responses.into_iter().next().unwrap_or_default();
        page_from_response(response, page.page_number)
    }

    fn annotate_pdf_chunk(
        &self,
        pdf_b64: &str,
        pages: &[usize],
    ) -> Result<(Vec<PageResult>, Option<usize>), CloudOcrError> {
        let parsed: BatchFileResponse = self.post("files:annotate", &file_request(pdf_b64, pages))?;

        let file = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| CloudOcrError::ResponseParsing("empty files:annotate response".into()))?;
        if let Some(error) = file.error {
            return Err(map_status(&error));
        }

        let total_pages = file.total_pages;
        let mut results = Vec::with_capacity(pages.len());
        for (idx, response) in file.responses.into_iter().enumerate() {
            let fallback = pages.get(idx).copied().unwrap_or(idx + 1);
            let page_number = response
                .context
                .as_ref()
                .and_then(|c| c.page_number)
                .unwrap_or(fallback);
            results.push(page_from_response(response, page_number)?);
        }
        Ok((results, total_pages))
    }
}

fn load_token_provider(config: &PipelineConfig, http: reqwest::blocking::Client) -> Option<TokenProvider> {
    let Some(path) = &config.credentials_path else {
        tracing::warn!("Cloud OCR enabled but GOOGLE_APPLICATION_CREDENTIALS is not set");
        return None;
    };

    match ServiceAccountKey::from_file(path).and_then(|key| TokenProvider::new(key, http)) {
        Ok(provider) => {
            tracing::info!(client_email = %provider.client_email(), "Cloud OCR credentials loaded");
            Some(provider)
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Cloud OCR credentials unusable");
            None
        }
    }
}

impl CloudOcrClient for GoogleVisionClient {
    fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    fn annotate_images(&self, pages: &[PageImage]) -> Result<Vec<PageResult>, CloudOcrFailure> {
        let mut results = Vec::with_capacity(pages.len());
        let mut billed_pages = 0;
        for page in pages {
            match self.annotate_image(page) {
                Ok(result) => {
                    tracing::debug!(
                        page = page.page_number,
                        chars = result.text.len(),
                        confidence = result.confidence,
                        "Cloud OCR page done"
                    );
                    billed_pages += 1;
                    results.push(result);
                }
                Err(e) if !e.is_fatal_for_batch() => {
                    tracing::warn!(page = page.page_number, error = %e, "Cloud OCR skipped page");
                    results.push(PageResult::failed(page.page_number));
                }
                Err(error) => return Err(CloudOcrFailure { error, billed_pages }),
            }
        }
        Ok(results)
    }

    fn annotate_pdf(&self, pdf_bytes: &[u8], page_count: usize) -> Result<Vec<PageResult>, CloudOcrFailure> {
        let pdf_b64 = base64::engine::general_purpose::STANDARD.encode(pdf_bytes);
        let mut total = page_count.max(1);
        let mut first = 1;
        let mut results = Vec::with_capacity(total);

        while first <= total {
            let pages = chunk_pages(first, total);
            let (mut chunk, reported_total) = self
                .annotate_pdf_chunk(&pdf_b64, &pages)
                .map_err(|error| CloudOcrFailure {
                    error,
                    billed_pages: results.len(),
                })?;
            tracing::debug!(first, count = chunk.len(), "Cloud OCR PDF chunk done");
            results.append(&mut chunk);

            // The page count is a guess when local parsing failed; trust the API.
            if let Some(reported) = reported_total {
                total = reported;
            }
            first += pages.len();
        }

        results.sort_by_key(|p| p.page_number);
        Ok(results)
    }
}

// ═══════════════════════════════════════════════════════════
// Request/response helpers
// ═══════════════════════════════════════════════════════════

fn features() -> Value {
    json!([{ "type": "DOCUMENT_TEXT_DETECTION" }])
}

fn image_request(png_bytes: &[u8]) -> Value {
    json!({
        "requests": [{
            "image": { "content": base64::engine::general_purpose::STANDARD.encode(png_bytes) },
            "features": features(),
            "imageContext": { "languageHints": LANGUAGE_HINTS },
        }]
    })
}

fn file_request(pdf_b64: &str, pages: &[usize]) -> Value {
    json!({
        "requests": [{
            "inputConfig": { "content": pdf_b64, "mimeType": "application/pdf" },
            "features": features(),
            "imageContext": { "languageHints": LANGUAGE_HINTS },
            "pages": pages,
        }]
    })
}

/// Page numbers for the chunk starting at `first`, at most `PDF_BATCH_PAGES` long.
fn chunk_pages(first: usize, total: usize) -> Vec<usize> {
    (first..=total).take(PDF_BATCH_PAGES).collect()
}

fn page_from_response(response: AnnotateImageResponse, page_number: usize) -> Result<PageResult, CloudOcrError> {
    if let Some(error) = response.error {
        return Err(map_status(&error));
    }

    let Some(annotation) = response.full_text_annotation else {
        // No text detected: a blank page, not an error.
        return Ok(PageResult::ocr(page_number, String::new(), DEFAULT_CLOUD_CONFIDENCE));
    };

    let confidences: Vec<f32> = annotation.pages.iter().filter_map(|p| p.confidence).collect();
    let confidence = if confidences.is_empty() {
        DEFAULT_CLOUD_CONFIDENCE
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32 * 100.0
    };

    Ok(PageResult::ocr(page_number, annotation.text, confidence))
}

/// Map a non-2xx HTTP response to a typed error.
fn map_http_error(status: u16, body: &str) -> CloudOcrError {
    let api_status = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| ApiStatus {
            code: status as i32,
            message: body.to_string(),
            status: None,
        });

    match (status, api_status.status.as_deref()) {
        (429, _) | (_, Some("RESOURCE_EXHAUSTED")) => CloudOcrError::QuotaExceeded(api_status.message),
        (403, _) | (_, Some("PERMISSION_DENIED")) => CloudOcrError::PermissionDenied(api_status.message),
        (400, _) | (_, Some("INVALID_ARGUMENT")) => CloudOcrError::InvalidImage(api_status.message),
        (401, _) | (_, Some("UNAUTHENTICATED")) => CloudOcrError::Auth(api_status.message),
        _ => CloudOcrError::Api {
            status,
            message: api_status.message,
        },
    }
}

/// Map an in-body `google.rpc.Status` (gRPC codes) to a typed error.
fn map_status(status: &ApiStatus) -> CloudOcrError {
    let message = status.message.clone();
    match (status.status.as_deref(), status.code) {
        (Some("RESOURCE_EXHAUSTED"), _) | (_, 8) => CloudOcrError::QuotaExceeded(message),
        (Some("PERMISSION_DENIED"), _) | (_, 7) => CloudOcrError::PermissionDenied(message),
        (Some("INVALID_ARGUMENT"), _) | (_, 3) => CloudOcrError::InvalidImage(message),
        (Some("UNAUTHENTICATED"), _) | (_, 16) => CloudOcrError::Auth(message),
        _ => CloudOcrError::Api {
            status: status.code.clamp(0, u16::MAX as i32) as u16,
            message,
        },
    }
}

// ═══════════════════════════════════════════════════════════
// Mock for testing
// ═══════════════════════════════════════════════════════════

/// Mock cloud engine returning fixed text per page, or a fixed failure.
pub struct MockCloudOcr {
    available: bool,
    text: String,
    confidence: f32,
    failure: Option<(CloudOcrError, usize)>,
    calls: AtomicUsize,
}

impl MockCloudOcr {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            available: true,
            text: text.to_string(),
            confidence,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: CloudOcrError) -> Self {
        Self::failing_after(0, error)
    }

    /// Fails with `error` after `billed` pages were processed and charged.
    pub fn failing_after(billed: usize, error: CloudOcrError) -> Self {
        Self {
            failure: Some((error, billed)),
            ..Self::new("", 0.0)
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::failing(CloudOcrError::Unavailable("mock".into()))
        }
    }

    /// Number of annotate calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn pages(&self, numbers: impl Iterator<Item = usize>) -> Result<Vec<PageResult>, CloudOcrFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let pages: Vec<PageResult> = numbers
            .map(|n| PageResult::ocr(n, self.text.clone(), self.confidence))
            .collect();
        match &self.failure {
            Some((error, billed)) => Err(CloudOcrFailure {
                error: error.clone(),
                billed_pages: (*billed).min(pages.len()),
            }),
            None => Ok(pages),
        }
    }
}

impl CloudOcrClient for MockCloudOcr {
    fn is_available(&self) -> bool {
        self.available
    }

    fn annotate_images(&self, pages: &[PageImage]) -> Result<Vec<PageResult>, CloudOcrFailure> {
        self.pages(pages.iter().map(|p| p.page_number))
    }

    fn annotate_pdf(&self, _pdf_bytes: &[u8], page_count: usize) -> Result<Vec<PageResult>, CloudOcrFailure> {
        self.pages(1..=page_count.max(1))
    }
}
