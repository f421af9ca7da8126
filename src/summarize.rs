//! Top-level entry points: PDF in, summary report out.
//!
//! ```text
//! input ─▶ extract ─▶ Summarizer ─▶ failure policy ─▶ layout ─▶ render
//! ```
//!
//! The failure policy sits between summarisation and rendering: a run in
//! which every model call failed, or a strict run with any failed unit, is
//! rejected before a report is drawn, so no output file is produced.

use crate::config::SummaryConfig;
use crate::error::SummaryError;
use crate::output::{PageSummaryRecord, SummaryOutput, SummaryStats};
use crate::pipeline::analyze::ImageAnalyzer;
use crate::pipeline::extract::{extract_pages_async, ExtractOptions};
use crate::pipeline::input::{self, LoadedPdf};
use crate::pipeline::layout::{layout_report, ReportMeta};
use crate::pipeline::llm::{LlmClient, VisionModel};
use crate::pipeline::orchestrate::{CallCounts, Summarizer};
use crate::pipeline::render::write_pdf_async;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Summarise a PDF file or URL.
///
/// This is the primary entry point for the library. The LLM provider is
/// resolved from `config` and the environment; OCR uses tesseract unless
/// disabled.
///
/// # Returns
/// `Ok(SummaryOutput)` on success, even if some units failed (check
/// `output.stats.degraded_pages` and each page's `errors`).
///
/// # Errors
/// Returns `Err(SummaryError)` only for fatal errors:
/// - File not found / not a PDF / download failure
/// - Corrupt or encrypted PDF
/// - No LLM provider configured
/// - Every model call failed, or any unit failed in strict mode
pub async fn summarize(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let input_str = input_str.as_ref();
    info!("Starting summary: {}", input_str);
    let loaded = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run(loaded, config).await
}

/// Summarise PDF bytes held in memory.
///
/// `source_name` is shown in the report header.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_summary::{summarize_bytes, SummaryConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("document.pdf")?;
/// let output = summarize_bytes(bytes, "document.pdf", &SummaryConfig::default()).await?;
/// std::fs::write("summary.pdf", &output.report)?;
/// # Ok(())
/// # }
/// ```
pub async fn summarize_bytes(
    bytes: Vec<u8>,
    source_name: &str,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    input::validate_pdf_magic(source_name, &bytes)?;
    let loaded = LoadedPdf {
        source_name: source_name.to_string(),
        bytes,
    };
    run(loaded, config).await
}

/// Summarise a PDF and write the report to `output_path`.
///
/// The report is written to a temporary file next to the target and then
/// renamed, so a failed run never leaves a partial file behind.
pub async fn summarize_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let output = summarize(input_str, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let report = output.report.clone();

    tokio::task::spawn_blocking(move || write_atomic(&path, &report))
        .await
        .map_err(|e| SummaryError::Internal(format!("Write task panicked: {}", e)))??;

    Ok(output)
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummaryError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize(input_str, config))
}

/// Run the pipeline on a loaded PDF with an explicit model and analyser.
///
/// The `summarize*` functions call this with an [`LlmClient`] and an
/// [`ImageAnalyzer`] built from `config`.
pub async fn summarize_with<M: VisionModel>(
    pdf: LoadedPdf,
    model: M,
    analyzer: ImageAnalyzer,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let total_start = Instant::now();
    let LoadedPdf { source_name, bytes } = pdf;

    // ── Step 1: Extract ──────────────────────────────────────────────────
    let extract_start = Instant::now();
    let records = extract_pages_async(bytes, ExtractOptions::from_config(&source_name, config)).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let total_pages = records.len();
    let scanned_pages = records.iter().filter(|r| r.was_scanned).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total_pages, scanned_pages);
    }

    // ── Step 2: Summarise ────────────────────────────────────────────────
    let summarize_start = Instant::now();
    let summarizer = Summarizer::new(model, analyzer, config.clone());
    let pages = summarizer.summarize_pages(records).await;
    let summarize_duration_ms = summarize_start.elapsed().as_millis() as u64;

    let counts = summarizer.call_counts();
    check_failures(&pages, counts, config.strict)?;

    // ── Step 3: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let doc = layout_report(&pages, &ReportMeta::new(&source_name));
    let report_pages = doc.page_count();
    let report = write_pdf_async(doc).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let usage = summarizer.usage();
    let stats = SummaryStats {
        total_pages,
        scanned_pages,
        total_images: pages.iter().map(|p| p.image_summaries.len()).sum(),
        degraded_pages: pages.iter().filter(|p| p.is_degraded()).count(),
        model_calls: counts.attempted,
        failed_calls: counts.failed,
        total_input_tokens: usage.input_tokens,
        total_output_tokens: usage.output_tokens,
        report_pages,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        extract_duration_ms,
        summarize_duration_ms,
        render_duration_ms,
    };

    info!(
        "Summary complete: {} pages ({} degraded), {} report pages, {}ms total",
        stats.total_pages, stats.degraded_pages, stats.report_pages, stats.total_duration_ms
    );

    Ok(SummaryOutput {
        pages,
        stats,
        report,
    })
}

/// Apply the run-level failure policy.
///
/// - Every attempted model call failed → [`SummaryError::AllCallsFailed`].
///   A run with no model calls at all (blank document) is fine.
/// - `strict` and any page has errors → [`SummaryError::PartialFailure`].
pub fn check_failures(
    pages: &[PageSummaryRecord],
    counts: CallCounts,
    strict: bool,
) -> Result<(), SummaryError> {
    let first_error = || {
        pages
            .iter()
            .flat_map(|p| p.errors.iter())
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string())
    };

    if counts.attempted > 0 && counts.failed == counts.attempted {
        let first = pages
            .iter()
            .flat_map(|p| p.errors.iter())
            .find(|e| e.is_model_failure())
            .map(|e| e.to_string())
            .unwrap_or_else(first_error);
        return Err(SummaryError::AllCallsFailed {
            total: counts.attempted,
            first_error: first,
        });
    }

    if strict {
        let failed_pages = pages.iter().filter(|p| p.is_degraded()).count();
        if failed_pages > 0 {
            return Err(SummaryError::PartialFailure {
                failed_pages,
                failed_units: pages.iter().map(|p| p.errors.len()).sum(),
                total_pages: pages.len(),
                first_error: first_error(),
            });
        }
    }

    Ok(())
}

async fn run(loaded: LoadedPdf, config: &SummaryConfig) -> Result<SummaryOutput, SummaryError> {
    let model = LlmClient::from_config(config)?;
    let analyzer = ImageAnalyzer::from_config(config);
    summarize_with(loaded, model, analyzer, config).await
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SummaryError> {
    let write_err = |source: std::io::Error| SummaryError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Report written to {}", path.display());
    Ok(())
}
