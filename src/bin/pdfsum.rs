//! CLI binary for edgequake-pdf-summary.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SummaryConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_summary::config::{
    DEFAULT_FIXED_BINARIZATION_LEVEL, DEFAULT_OUTPUT_PATH, DEFAULT_SCAN_DPI,
};
use edgequake_pdf_summary::{
    summarize_to_file, Binarization, ProgressCallback, SummaryConfig, SummaryProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Bar style shared by the download and page bars; `counters` follows the bar.
fn bar_style(counters: &str) -> ProgressStyle {
    let template = format!("{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {counters}");
    ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished page. Pages may finish
/// out of order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    unit_errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until extraction reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Extracting");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            unit_errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar
            .set_style(bar_style("{pos:>3}/{len} pages  ⏱ {elapsed_precise}  ETA {eta_precise}"));
        self.bar.set_prefix("Summarising");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_no: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_no))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_extraction_complete(&self, total_pages: usize, scanned_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {} {}",
            cyan("◆"),
            bold(&format!("Summarising {total_pages} pages…")),
            dim(&format!("({scanned_pages} scanned)"))
        ));
    }

    fn on_page_start(&self, page_no: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_no, Instant::now());
        }
        self.bar.set_message(format!("page {page_no}"));
    }

    fn on_page_complete(&self, page_no: usize, total: usize, image_count: usize) {
        let secs = self.elapsed_secs(page_no);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_no,
            total,
            dim(&format!("{image_count:>2} image(s)")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_unit_error(&self, page_no: usize, _total: usize, error: String) {
        self.unit_errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per error.
        let first_line = error.lines().next().unwrap_or_default();
        let msg: String = if first_line.chars().count() > 90 {
            let cut: String = first_line.chars().take(89).collect();
            format!("{cut}\u{2026}")
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            yellow("⚠"),
            page_no,
            yellow(&msg),
        ));
    }

    fn on_summary_complete(&self, total_pages: usize, degraded_pages: usize) {
        self.bar.finish_and_clear();
        if degraded_pages == 0 {
            eprintln!(
                "{} {} pages summarised",
                green("✔"),
                bold(&total_pages.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages summarised  ({} with placeholders, {} unit error(s))",
                cyan("⚠"),
                bold(&total_pages.to_string()),
                yellow(&degraded_pages.to_string()),
                self.unit_errors.load(Ordering::SeqCst),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a PDF into pdf_summary_report.pdf
  pdfsum --pdf report.pdf

  # Choose the output file and model
  pdfsum --pdf report.pdf --out summary.pdf --provider openai --model gpt-4.1-mini

  # Summarise a PDF from a URL, printing per-page records as JSON
  pdfsum --pdf https://arxiv.org/pdf/1706.03762 --json > pages.json

  # Scanned document in German, fixed binarisation level
  pdfsum --pdf scan.pdf --ocr-lang deu --ocr-threshold 180

  # Fail instead of writing placeholders
  pdfsum --pdf report.pdf --strict

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
  PDFSUM_*                Every flag below has a PDFSUM_ variable

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Install OCR:     apt install tesseract-ocr   (or pass --no-ocr)
  3. Summarise:       pdfsum --pdf document.pdf

  PDFium (~30 MB) is downloaded automatically on first run and cached.
"#;

/// Summarise PDF files page by page into a PDF report using multimodal LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsum",
    version,
    about = "Summarise PDF files page by page into a PDF report using multimodal LLMs",
    long_about = "Extract the text and images of every page of a PDF (rasterising scanned \
pages), summarise them with a multimodal LLM, and write a PDF report with a table of \
contents and one section per page. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI \
and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(long, env = "PDFSUM_PDF")]
    pdf: String,

    /// Output report path.
    #[arg(short, long, env = "PDFSUM_OUT", default_value = DEFAULT_OUTPUT_PATH)]
    out: PathBuf,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, gemini-2.5-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of pages summarised concurrently.
    #[arg(short, long, env = "PDFSUM_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Character budget per text-summary request.
    #[arg(long, env = "PDFSUM_MAX_CHUNK_CHARS", default_value_t = 35_000)]
    max_chunk_chars: usize,

    /// Do not rasterise pages that have (almost) no text layer.
    #[arg(long, env = "PDFSUM_NO_OCR_ON_FAIL")]
    no_ocr_on_fail: bool,

    /// DPI for rasterised scanned pages (72–600).
    #[arg(long, env = "PDFSUM_SCAN_DPI", default_value_t = DEFAULT_SCAN_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    scan_dpi: u32,

    /// Skip OCR of page images (no tesseract needed).
    #[arg(long, env = "PDFSUM_NO_OCR")]
    no_ocr: bool,

    /// Tesseract language code(s), e.g. eng or eng+deu.
    #[arg(long, env = "PDFSUM_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Path to the tesseract binary.
    #[arg(long, env = "PDFSUM_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Fixed binarisation level for OCR; bare flag means 200 (default: Otsu per image).
    #[arg(long, env = "PDFSUM_OCR_THRESHOLD", num_args = 0..=1)]
    ocr_threshold: Option<Option<u8>>,

    /// Edge density above which an image is flagged as a chart (0–1).
    #[arg(long, env = "PDFSUM_CHART_THRESHOLD", default_value_t = 0.06)]
    chart_threshold: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSUM_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom text-summary prompt.
    #[arg(long, env = "PDFSUM_TEXT_PROMPT")]
    text_prompt: Option<PathBuf>,

    /// Path to a text file containing a custom image-description prompt.
    #[arg(long, env = "PDFSUM_IMAGE_PROMPT")]
    image_prompt: Option<PathBuf>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "PDFSUM_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFSUM_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per LLM call.
    #[arg(long, env = "PDFSUM_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDFSUM_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFSUM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Fail if any chunk or image could not be summarised.
    #[arg(long, env = "PDFSUM_STRICT")]
    strict: bool,

    /// Also print the per-page records and stats as JSON on stdout.
    #[arg(long, env = "PDFSUM_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSUM_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    ensure_pdf_engine(cli.quiet)?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = match summarize_to_file(&cli.pdf, &cli.out, &config).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!("Summary failed: {e}");
            return Err(e).context("Summary failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} pages  {} report pages  {}ms  →  {}",
            if stats.degraded_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.total_pages,
            stats.report_pages,
            stats.total_duration_ms,
            bold(&cli.out.display().to_string()),
        );
        eprintln!(
            "   {} model calls ({} failed)  /  {} tokens in  /  {} tokens out",
            dim(&stats.model_calls.to_string()),
            dim(&stats.failed_calls.to_string()),
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Download libpdfium on first run; later runs only check the cache.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let bar = ProgressBar::new(0);
    bar.set_style(bar_style("{bytes}/{total_bytes}  ETA {eta_precise}"));
    bar.set_prefix("PDF engine");
    bar.enable_steady_tick(Duration::from_millis(80));

    let report = |downloaded: u64, total: Option<u64>| {
        if let Some(total) = total.filter(|&t| bar.length() != Some(t)) {
            bar.set_length(total);
        }
        bar.set_position(downloaded);
    };
    let result = tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(Some(&report)));

    match result {
        Ok(_) => {
            bar.finish_with_message("ready");
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e).context("Failed to download PDFium engine")
        }
    }
}

/// Map CLI args to `SummaryConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .ocr_on_fail(!cli.no_ocr_on_fail)
        .scan_dpi(cli.scan_dpi)
        .max_chunk_chars(cli.max_chunk_chars)
        .chart_edge_threshold(cli.chart_threshold)
        .binarization(binarization(cli.ocr_threshold))
        .ocr_enabled(!cli.no_ocr)
        .ocr_language(cli.ocr_lang.clone())
        .concurrency(cli.concurrency)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .strict(cli.strict);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref path) = cli.tesseract {
        builder = builder.tesseract_path(path.clone());
    }
    if let Some(ref path) = cli.text_prompt {
        builder = builder.text_prompt(read_prompt(path).await?);
    }
    if let Some(ref path) = cli.image_prompt {
        builder = builder.image_prompt(read_prompt(path).await?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn binarization(level: Option<Option<u8>>) -> Binarization {
    match level {
        Some(Some(level)) => Binarization::Fixed(level),
        Some(None) => Binarization::Fixed(DEFAULT_FIXED_BINARIZATION_LEVEL),
        None => Binarization::Otsu,
    }
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_flag_is_required() {
        assert!(Cli::try_parse_from(["pdfsum"]).is_err());
    }

    #[test]
    fn defaults_match_library() {
        let cli = Cli::try_parse_from(["pdfsum", "--pdf", "in.pdf"]).unwrap();
        assert_eq!(cli.out, PathBuf::from("pdf_summary_report.pdf"));
        assert_eq!(cli.concurrency, 4);
        assert_eq!(cli.max_chunk_chars, 35_000);
        assert_eq!(cli.scan_dpi, 200);
        assert_eq!(binarization(cli.ocr_threshold), Binarization::Otsu);
    }

    #[test]
    fn threshold_selects_fixed_binarization() {
        let cli = Cli::try_parse_from(["pdfsum", "--pdf", "a.pdf", "--ocr-threshold", "180"]).unwrap();
        assert_eq!(binarization(cli.ocr_threshold), Binarization::Fixed(180));
    }

    #[test]
    fn bare_threshold_uses_default_level() {
        let cli = Cli::try_parse_from(["pdfsum", "--pdf", "a.pdf", "--ocr-threshold"]).unwrap();
        assert_eq!(
            binarization(cli.ocr_threshold),
            Binarization::Fixed(DEFAULT_FIXED_BINARIZATION_LEVEL)
        );
    }

    #[test]
    fn scan_dpi_is_range_checked() {
        assert!(Cli::try_parse_from(["pdfsum", "--pdf", "a.pdf", "--scan-dpi", "1200"]).is_err());
    }
}
