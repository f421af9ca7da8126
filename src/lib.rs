//! # edgequake-pdf-summary
//!
//! Summarise PDF documents page by page with multimodal LLMs and render the
//! result as a new PDF report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file, URL or in-memory bytes
//!  ├─ 2. Extract    text layer + embedded images via pdfium; pages with
//!  │                (almost) no text are rasterised at 200 DPI
//!  ├─ 3. Analyse    OCR (tesseract) + "likely chart" edge heuristic per image
//!  ├─ 4. Summarise  text chunks and images sent to the LLM, concurrently
//!  │                across pages, with retries and per-call timeouts
//!  └─ 5. Report     table of contents + one section per page, drawn with pdfium
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_summary::{summarize_to_file, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = SummaryConfig::default();
//!     let output = summarize_to_file("document.pdf", "summary.pdf", &config).await?;
//!     eprintln!("{} pages, {} degraded",
//!         output.stats.total_pages,
//!         output.stats.degraded_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Failed model calls
//!
//! A chunk or image whose model call fails after retries is replaced by a
//! placeholder and recorded in the page's `errors`; the rest of the report
//! is unaffected. Set [`SummaryConfig::strict`] to fail the whole run
//! instead. A run in which every model call failed is always an error.
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdfsum` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | off     | Enables the `pdfsum-server` HTTP binary (axum + tower-http) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Binarization, SummaryConfig, SummaryConfigBuilder};
pub use error::{ErrorKind, ModelError, OcrError, SummaryError, UnitError};
pub use output::{
    ImageMetadata, ImageSummary, PageRecord, PageSummaryRecord, SummaryOutput, SummaryStats,
};
pub use pipeline::analyze::ImageAnalyzer;
pub use pipeline::llm::{LlmClient, ModelUsage, VisionModel};
pub use pipeline::ocr::{NoOcr, OcrEngine, TesseractCli};
pub use pipeline::orchestrate::{Summarizer, CHUNK_PLACEHOLDER, IMAGE_PLACEHOLDER};
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use summarize::{summarize, summarize_bytes, summarize_sync, summarize_to_file, summarize_with};
