//! Configuration types for PDF summarisation.
//!
//! All pipeline behaviour is controlled through [`SummaryConfig`], built via
//! its [`SummaryConfigBuilder`]. The extraction and analysis thresholds are
//! heuristics, so each one is a named constant here and a field on the
//! config: tests and callers can tune them without touching the pipeline.

use crate::error::SummaryError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Pages whose trimmed text layer is shorter than this are treated as scanned.
pub const DEFAULT_SCANNED_TEXT_THRESHOLD: usize = 30;

/// DPI used to rasterise scanned pages.
pub const DEFAULT_SCAN_DPI: u32 = 200;

/// Longest edge, in pixels, of a scanned-page render.
pub const DEFAULT_MAX_RENDERED_PIXELS: u32 = 4000;

/// Character budget for one text-summary request.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 35_000;

/// Edge-pixel fraction above which an image is flagged as a likely chart.
pub const DEFAULT_CHART_EDGE_THRESHOLD: f32 = 0.06;

/// Canny hysteresis thresholds used by the chart heuristic.
pub const CANNY_LOW_THRESHOLD: f32 = 50.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 150.0;

/// Grey level used by [`Binarization::Fixed`] when no level is given.
pub const DEFAULT_FIXED_BINARIZATION_LEVEL: u8 = 200;

/// Upper bound on retry attempts per model call.
pub const MAX_RETRIES: u32 = 10;

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Default output path of the CLI.
pub const DEFAULT_OUTPUT_PATH: &str = "pdf_summary_report.pdf";

/// How page images are binarised before OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Binarization {
    /// Pick the level per image with Otsu's method (default).
    #[default]
    Otsu,
    /// Use a fixed grey level; pixels above it become white.
    Fixed(u8),
}

/// Configuration for a PDF summarisation run.
///
/// Built via [`SummaryConfig::builder()`] or using
/// [`SummaryConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf_summary::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .concurrency(2)
///     .max_chunk_chars(20_000)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Rasterise pages with (almost) no text layer. Default: true.
    pub ocr_on_fail: bool,

    /// Trimmed text shorter than this marks a page as scanned. Default: 30.
    pub scanned_text_threshold: usize,

    /// DPI for scanned-page renders. Range: 72–600. Default: 200.
    pub scan_dpi: u32,

    /// Cap on the longest edge of a scanned-page render. Default: 4000.
    ///
    /// A 200-DPI render of an A0 poster would otherwise allocate hundreds
    /// of megabytes.
    pub max_rendered_pixels: u32,

    /// Character budget per text-summary request. Default: 35 000.
    pub max_chunk_chars: usize,

    /// Edge density above which an image is flagged as a chart. Default: 0.06.
    pub chart_edge_threshold: f32,

    /// Binarisation applied before OCR. Default: Otsu.
    pub binarization: Binarization,

    /// Run OCR on page images. Default: true.
    ///
    /// When false, [`crate::ImageMetadata::ocr_text`] is always empty and no
    /// OCR binary is required.
    pub ocr_enabled: bool,

    /// Tesseract language code. Default: "eng".
    pub ocr_language: String,

    /// Path to the tesseract binary. If None, `tesseract` is looked up on PATH.
    pub tesseract_path: Option<PathBuf>,

    /// Number of pages summarised concurrently. Default: 4.
    ///
    /// 1 processes pages strictly one after another. Chunks and images
    /// within a page are always processed in order.
    pub concurrency: usize,

    /// LLM model identifier. If None, the provider default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 2048.
    pub max_tokens: usize,

    /// Retry attempts per model call, at most [`MAX_RETRIES`]. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Timeout of one model call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom text-summary prompt. If None, uses the built-in prompt.
    pub text_prompt: Option<String>,

    /// Custom image-description prompt. If None, uses the built-in prompt.
    pub image_prompt: Option<String>,

    /// Fail the run instead of emitting placeholders for failed units.
    /// Default: false.
    pub strict: bool,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            ocr_on_fail: true,
            scanned_text_threshold: DEFAULT_SCANNED_TEXT_THRESHOLD,
            scan_dpi: DEFAULT_SCAN_DPI,
            max_rendered_pixels: DEFAULT_MAX_RENDERED_PIXELS,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            chart_edge_threshold: DEFAULT_CHART_EDGE_THRESHOLD,
            binarization: Binarization::default(),
            ocr_enabled: true,
            ocr_language: "eng".to_string(),
            tesseract_path: None,
            concurrency: 4,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 2048,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            text_prompt: None,
            image_prompt: None,
            strict: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("ocr_on_fail", &self.ocr_on_fail)
            .field("scanned_text_threshold", &self.scanned_text_threshold)
            .field("scan_dpi", &self.scan_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("chart_edge_threshold", &self.chart_edge_threshold)
            .field("binarization", &self.binarization)
            .field("ocr_enabled", &self.ocr_enabled)
            .field("ocr_language", &self.ocr_language)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("strict", &self.strict)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn ocr_on_fail(mut self, v: bool) -> Self {
        self.config.ocr_on_fail = v;
        self
    }

    pub fn scanned_text_threshold(mut self, chars: usize) -> Self {
        self.config.scanned_text_threshold = chars;
        self
    }

    pub fn scan_dpi(mut self, dpi: u32) -> Self {
        self.config.scan_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_chunk_chars(mut self, chars: usize) -> Self {
        self.config.max_chunk_chars = chars;
        self
    }

    pub fn chart_edge_threshold(mut self, fraction: f32) -> Self {
        self.config.chart_edge_threshold = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn binarization(mut self, b: Binarization) -> Self {
        self.config.binarization = b;
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn text_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.text_prompt = Some(prompt.into());
        self
    }

    pub fn image_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.image_prompt = Some(prompt.into());
        self
    }

    pub fn strict(mut self, v: bool) -> Self {
        self.config.strict = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummaryError> {
        let c = &self.config;
        if c.max_chunk_chars == 0 {
            return Err(SummaryError::InvalidConfig(
                "max_chunk_chars must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(SummaryError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(SummaryError::InvalidConfig(
                "ocr_language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let c = SummaryConfig::default();
        assert!(c.ocr_on_fail);
        assert_eq!(c.scanned_text_threshold, 30);
        assert_eq!(c.scan_dpi, 200);
        assert_eq!(c.max_chunk_chars, 35_000);
        assert!((c.chart_edge_threshold - 0.06).abs() < f32::EPSILON);
        assert_eq!(c.binarization, Binarization::Otsu);
        assert!(!c.strict);
    }

    #[test]
    fn builder_clamps_values() {
        let c = SummaryConfig::builder()
            .scan_dpi(10)
            .concurrency(0)
            .temperature(9.0)
            .chart_edge_threshold(-1.0)
            .max_retries(u32::MAX)
            .build()
            .unwrap();
        assert_eq!(c.scan_dpi, 72);
        assert_eq!(c.max_retries, MAX_RETRIES);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.chart_edge_threshold, 0.0);
    }

    #[test]
    fn zero_chunk_budget_is_rejected() {
        let err = SummaryConfig::builder().max_chunk_chars(0).build().unwrap_err();
        assert!(err.to_string().contains("max_chunk_chars"));
    }

    #[test]
    fn debug_hides_provider() {
        let c = SummaryConfig::builder().model("gemini-2.5-flash").build().unwrap();
        let s = format!("{c:?}");
        assert!(s.contains("gemini-2.5-flash"));
        assert!(s.contains("provider: None"));
    }
}
