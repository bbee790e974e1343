use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Juritext";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default render scale for rasterized pages (2.0 = 144 DPI on a 72 DPI page).
pub const DEFAULT_RASTER_SCALE: f32 = 2.0;

/// Default cloud OCR page budget per calendar day.
pub const DEFAULT_DAILY_LIMIT: u32 = 100;

/// Default cloud OCR page budget per calendar month (Vision free tier).
pub const DEFAULT_MONTHLY_LIMIT: u32 = 1000;

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "juritext=info,juritext_lib=info"
}

/// Get the application data directory
/// ~/.juritext/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".juritext")
}

/// Default location of the cloud OCR quota record
pub fn default_quota_file() -> PathBuf {
    app_data_dir().join("ocr-quota.json")
}

/// Runtime options recognized by the extraction pipeline.
///
/// Every field can be sourced from the environment via [`PipelineConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub cloud_ocr_enabled: bool,
    pub project_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub daily_limit: u32,
    pub monthly_limit: u32,
    pub raster_scale: f32,
    pub quota_file: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cloud_ocr_enabled: false,
            project_id: None,
            credentials_path: None,
            daily_limit: DEFAULT_DAILY_LIMIT,
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
            raster_scale: DEFAULT_RASTER_SCALE,
            quota_file: default_quota_file(),
        }
    }
}

impl PipelineConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (env, test map...).
    ///
    /// Malformed values are logged and replaced by their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cloud_ocr_enabled = match non_empty("JURITEXT_CLOUD_OCR_ENABLED") {
            Some(v) => parse_bool(&v).unwrap_or_else(|| {
                tracing::warn!(value = %v, "Invalid JURITEXT_CLOUD_OCR_ENABLED, cloud OCR disabled");
                false
            }),
            None => defaults.cloud_ocr_enabled,
        };

        let raster_scale = parse_or_default(
            non_empty("JURITEXT_RASTER_SCALE"),
            "JURITEXT_RASTER_SCALE",
            defaults.raster_scale,
        );
        let raster_scale = if raster_scale > 0.0 && raster_scale.is_finite() {
            raster_scale
        } else {
            tracing::warn!(raster_scale, "Raster scale must be positive, using default");
            DEFAULT_RASTER_SCALE
        };

        Self {
            cloud_ocr_enabled,
            project_id: non_empty("GOOGLE_CLOUD_PROJECT"),
            credentials_path: non_empty("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            daily_limit: parse_or_default(
                non_empty("JURITEXT_OCR_DAILY_LIMIT"),
                "JURITEXT_OCR_DAILY_LIMIT",
                defaults.daily_limit,
            ),
            monthly_limit: parse_or_default(
                non_empty("JURITEXT_OCR_MONTHLY_LIMIT"),
                "JURITEXT_OCR_MONTHLY_LIMIT",
                defaults.monthly_limit,
            ),
            raster_scale,
            quota_file: non_empty("JURITEXT_QUOTA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.quota_file),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or_default<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match value {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "Invalid configuration value, using default");
            default
        }),
        None => default,
    }
}
