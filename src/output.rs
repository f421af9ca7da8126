//! Records flowing through the pipeline and the final output.
//!
//! ```text
//! PageRecord ──▶ PageSummaryRecord ──▶ SummaryOutput
//! (extract)      (orchestrate)         (report bytes + stats)
//! ```

use crate::error::UnitError;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Raw content extracted from one PDF page.
///
/// Created once per page by [`crate::pipeline::extract`] and not modified
/// afterwards.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// 1-indexed page number in source order.
    pub page_no: usize,
    /// Trimmed text layer; empty for textless pages.
    pub text: String,
    /// Page images in on-page order. For scanned pages the full-page render
    /// comes first.
    pub images: Vec<RgbImage>,
    /// True when the text layer was too short and the page was rasterised.
    pub was_scanned: bool,
    /// Extraction diagnostics (skipped images, failed renders).
    pub warnings: Vec<UnitError>,
}

impl PageRecord {
    /// A text-only page record.
    pub fn text_only(page_no: usize, text: impl Into<String>) -> Self {
        Self {
            page_no,
            text: text.into(),
            images: Vec::new(),
            was_scanned: false,
            warnings: Vec::new(),
        }
    }
}

/// What the image analyser learned about one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// OCR text; empty when OCR is disabled, failed, or found nothing.
    pub ocr_text: String,
    /// Heuristic "likely chart or diagram" flag. Approximate by nature.
    pub is_chart: bool,
    /// `(width, height)` in pixels.
    pub size: (u32, u32),
}

/// Metadata and model description of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub meta: ImageMetadata,
    pub description: String,
}

/// Summarised content of one page, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummaryRecord {
    /// 1-indexed page number in source order.
    pub page_no: usize,
    /// Chunk summaries joined with newlines; empty for textless pages.
    pub text_summary: String,
    /// One entry per page image, in extraction order.
    pub image_summaries: Vec<ImageSummary>,
    /// One-line preview for the table of contents. May be empty.
    pub combined_short: String,
    /// Copied from the source [`PageRecord`].
    pub was_scanned: bool,
    /// Extraction warnings followed by summarisation failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<UnitError>,
}

impl PageSummaryRecord {
    /// Whether any unit of this page failed or was skipped.
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Statistics about a summarisation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Pages in the source PDF.
    pub total_pages: usize,
    /// Pages that were rasterised because their text layer was too short.
    pub scanned_pages: usize,
    /// Images analysed across all pages (renders included).
    pub total_images: usize,
    /// Pages with at least one unit error.
    pub degraded_pages: usize,
    /// Model calls attempted (chunks + images).
    pub model_calls: usize,
    /// Model calls that failed after retries.
    pub failed_calls: usize,
    /// Total input tokens reported by the provider.
    pub total_input_tokens: u64,
    /// Total output tokens reported by the provider.
    pub total_output_tokens: u64,
    /// Pages in the rendered report.
    pub report_pages: usize,
    /// Wall-clock time of the whole run.
    pub total_duration_ms: u64,
    /// Time spent in extraction.
    pub extract_duration_ms: u64,
    /// Time spent in analysis and model calls.
    pub summarize_duration_ms: u64,
    /// Time spent laying out and writing the report.
    pub render_duration_ms: u64,
}

/// The result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutput {
    /// Per-page summaries in page order.
    pub pages: Vec<PageSummaryRecord>,
    /// Run statistics.
    pub stats: SummaryStats,
    /// The rendered report PDF.
    #[serde(skip)]
    pub report: Vec<u8>,
}
