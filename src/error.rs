//! Error types for the edgequake-pdf-summary library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SummaryError`]: **Fatal**: no report can be produced (unreadable
//!   input, corrupt PDF, no LLM provider, output write failure). Returned as
//!   `Err(SummaryError)` from the top-level `summarize*` functions, and no
//!   output file is left behind.
//!
//! * [`UnitError`]: **Non-fatal**: one unit of work failed (an embedded
//!   image that would not decode, one chunk whose model call failed, one
//!   image whose description timed out). Stored in
//!   [`crate::output::PageSummaryRecord::errors`] next to the placeholder
//!   that replaced the missing content, so the rest of the report survives.
//!
//! Two leaf errors describe the opaque collaborators: [`ModelError`] for the
//! language model and [`OcrError`] for the OCR engine. The orchestrator wraps
//! them into [`UnitError`]s carrying the page and chunk/image index.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`SummaryError`].
///
/// Front ends map this to user-facing behaviour (the HTTP server answers
/// `400` for [`ErrorKind::InvalidInput`] and `500` for everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Extraction,
    Model,
    Render,
    Config,
    Internal,
}

/// All fatal errors returned by the edgequake-pdf-summary library.
#[derive(Debug, Error)]
pub enum SummaryError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a usable file path or URL, or the upload was
    /// rejected before processing.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read but do not start with the `%PDF` magic.
    #[error("'{source_name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{source_name}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { source_name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{source_name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{source_name}'")]
    WrongPassword { source_name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every model call of the run failed; the report would only contain
    /// placeholders.
    #[error("All {total} model calls failed.\nFirst error: {first_error}")]
    AllCallsFailed { total: usize, first_error: String },

    /// Strict mode: at least one unit of work failed.
    #[error("{failed_units} unit(s) failed on {failed_pages}/{total_pages} pages (strict mode)\nFirst error: {first_error}")]
    PartialFailure {
        failed_pages: usize,
        failed_units: usize,
        total_pages: usize,
        first_error: String,
    },

    // ── Render / I/O errors ───────────────────────────────────────────────
    /// pdfium refused to build the report document.
    #[error("Failed to render the summary report: {detail}")]
    RenderFailed { detail: String },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SummaryError {
    /// Classify the error for front ends.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummaryError::FileNotFound { .. }
            | SummaryError::PermissionDenied { .. }
            | SummaryError::InvalidInput { .. }
            | SummaryError::DownloadFailed { .. }
            | SummaryError::DownloadTimeout { .. }
            | SummaryError::NotAPdf { .. } => ErrorKind::InvalidInput,
            SummaryError::CorruptPdf { .. }
            | SummaryError::PasswordRequired { .. }
            | SummaryError::WrongPassword { .. }
            | SummaryError::PdfiumBindingFailed(_) => ErrorKind::Extraction,
            SummaryError::ProviderNotConfigured { .. }
            | SummaryError::AllCallsFailed { .. }
            | SummaryError::PartialFailure { .. } => ErrorKind::Model,
            SummaryError::RenderFailed { .. } | SummaryError::OutputWriteFailed { .. } => {
                ErrorKind::Render
            }
            SummaryError::InvalidConfig(_) => ErrorKind::Config,
            SummaryError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal error for a single unit of work.
///
/// Page numbers are 1-indexed; chunk and image indices are 0-indexed
/// positions within the page.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// An embedded image could not be decoded and was skipped.
    #[error("Page {page}: embedded image {image} skipped: {detail}")]
    ImageDecodeFailed {
        page: usize,
        image: usize,
        detail: String,
    },

    /// The full-page render for a scanned page failed.
    #[error("Page {page}: full-page render failed: {detail}")]
    PageRenderFailed { page: usize, detail: String },

    /// The text layer could not be read; the page is treated as textless.
    #[error("Page {page}: text layer unreadable: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// Summarising one text chunk failed.
    #[error("Page {page}: chunk {chunk} summary failed: {detail}")]
    ChunkFailed {
        page: usize,
        chunk: usize,
        detail: String,
    },

    /// Describing one image failed.
    #[error("Page {page}: image {image} description failed: {detail}")]
    ImageDescribeFailed {
        page: usize,
        image: usize,
        detail: String,
    },

    /// OCR of one image failed; its metadata carries empty OCR text.
    #[error("Page {page}: image {image} OCR failed: {detail}")]
    OcrFailed {
        page: usize,
        image: usize,
        detail: String,
    },
}

impl UnitError {
    /// 1-indexed page the failure belongs to.
    pub fn page(&self) -> usize {
        match self {
            UnitError::ImageDecodeFailed { page, .. }
            | UnitError::PageRenderFailed { page, .. }
            | UnitError::TextLayerFailed { page, .. }
            | UnitError::ChunkFailed { page, .. }
            | UnitError::ImageDescribeFailed { page, .. }
            | UnitError::OcrFailed { page, .. } => *page,
        }
    }

    /// Whether this failure came from a language-model call.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            UnitError::ChunkFailed { .. } | UnitError::ImageDescribeFailed { .. }
        )
    }
}

/// Failure of a single language-model call, after retries.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The provider returned an error on every attempt.
    #[error("LLM call failed after {retries} retries: {detail}")]
    Failed { retries: u32, detail: String },

    /// The last attempt did not answer in time.
    #[error("LLM call timed out after {secs}s ({retries} retries)")]
    Timeout { secs: u64, retries: u32 },

    /// The request could not be built (e.g. image encoding failed).
    #[error("Could not build LLM request: {0}")]
    Request(String),
}

/// Failure of the OCR engine for one image.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The OCR binary could not be started.
    #[error("Could not run '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The OCR binary ran but reported failure.
    #[error("OCR engine failed: {0}")]
    Engine(String),

    /// Writing the image for the OCR engine failed.
    #[error("Could not prepare image for OCR: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the image for the OCR engine failed.
    #[error("Could not encode image for OCR: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = SummaryError::PartialFailure {
            failed_pages: 1,
            failed_units: 2,
            total_pages: 10,
            first_error: "Page 3: chunk 0 summary failed: boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
        assert!(msg.contains("strict"), "got: {msg}");
    }

    #[test]
    fn kinds_group_variants() {
        assert_eq!(
            SummaryError::NotAPdf {
                source_name: "a.txt".into(),
                magic: b"%PNG".to_vec(),
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            SummaryError::CorruptPdf {
                source_name: "a.pdf".into(),
                detail: "xref".into(),
            }
            .kind(),
            ErrorKind::Extraction
        );
        assert_eq!(
            SummaryError::AllCallsFailed {
                total: 3,
                first_error: "401".into(),
            }
            .kind(),
            ErrorKind::Model
        );
        assert_eq!(
            SummaryError::RenderFailed {
                detail: "font".into()
            }
            .kind(),
            ErrorKind::Render
        );
    }

    #[test]
    fn unit_error_carries_location() {
        let e = UnitError::ChunkFailed {
            page: 4,
            chunk: 2,
            detail: "rate limited".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 4"));
        assert!(msg.contains("chunk 2"));
        assert!(e.is_model_failure());
        assert_eq!(e.page(), 4);
        assert!(!UnitError::OcrFailed {
            page: 1,
            image: 0,
            detail: "x".into()
        }
        .is_model_failure());
    }

    #[test]
    fn model_timeout_display() {
        let e = ModelError::Timeout { secs: 30, retries: 2 };
        assert!(e.to_string().contains("30s"));
    }
}
