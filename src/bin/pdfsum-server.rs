//! pdfsum-server: HTTP front end for edgequake-pdf-summary.
//!
//! Upload a PDF, get the summary report back.
//!
//! Usage:
//!   PDFSUM_BIND=0.0.0.0:8000 OPENAI_API_KEY=sk-... pdfsum-server
//!
//!   curl -F file=@paper.pdf http://localhost:8000/summarize -o summary.pdf

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use edgequake_pdf_summary::pipeline::llm::LlmClient;
use edgequake_pdf_summary::{summarize_bytes, ErrorKind, SummaryConfig, SummaryError};
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
struct AppState {
    config: Arc<SummaryConfig>,
    start_time: Instant,
}

// ============================================================================
// Error type
// ============================================================================

struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "detail": self.1 }))).into_response()
    }
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, msg.into())
}

fn processing_failed(msg: impl Into<String>) -> AppError {
    AppError(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Processing failed: {}", msg.into()),
    )
}

/// Bad input is the caller's fault; everything else is ours.
fn error_response(e: &SummaryError) -> AppError {
    match e.kind() {
        ErrorKind::InvalidInput => bad_request(e.to_string()),
        _ => processing_failed(e.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    message: String,
    version: String,
    uptime_secs: u64,
}

// GET /
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "PDF summarizer is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// POST /summarize  (multipart, field "file")
async fn summarize_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if !is_pdf_name(&file_name) {
            return Err(bad_request("Only PDF files are supported."));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) = upload.ok_or_else(|| bad_request("Missing multipart field 'file'."))?;
    info!("Received '{}' ({} bytes)", file_name, bytes.len());

    let output = summarize_bytes(bytes, &file_name, &state.config)
        .await
        .map_err(|e| {
            error!("Summary of '{}' failed: {}", file_name, e);
            error_response(&e)
        })?;

    info!(
        "Summarised '{}': {} pages, {} degraded, {}ms",
        file_name,
        output.stats.total_pages,
        output.stats.degraded_pages,
        output.stats.total_duration_ms
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"summary.pdf\"",
            ),
        ],
        output.report,
    )
        .into_response())
}

/// Uploads are accepted by file name, like a browser form would filter them.
fn is_pdf_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

// ============================================================================
// Startup
// ============================================================================

/// HTTP server that summarises uploaded PDFs into PDF reports.
#[derive(Parser, Debug)]
#[command(name = "pdfsum-server", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "PDFSUM_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Pages summarised concurrently per request.
    #[arg(short, long, env = "PDFSUM_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Skip OCR of page images.
    #[arg(long, env = "PDFSUM_NO_OCR")]
    no_ocr: bool,

    /// Tesseract language code(s).
    #[arg(long, env = "PDFSUM_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Reject a request if any chunk or image fails.
    #[arg(long, env = "PDFSUM_STRICT")]
    strict: bool,

    /// Maximum upload size in megabytes.
    #[arg(long, env = "PDFSUM_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with_writer(io::stderr)
        .init();

    tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
        .context("Failed to download PDFium engine")?;

    let mut builder = SummaryConfig::builder()
        .concurrency(args.concurrency)
        .ocr_enabled(!args.no_ocr)
        .ocr_language(args.ocr_lang.clone())
        .strict(args.strict);
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    // Requests would fail anyway; say so at startup.
    if let Err(e) = LlmClient::from_config(&config) {
        warn!("LLM provider not ready, requests will fail: {e}");
    }

    let state = AppState {
        config: Arc::new(config),
        start_time: Instant::now(),
    };

    let app = Router::new()
        .route("/", get(health_handler))
        .route("/summarize", post(summarize_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(args.max_upload_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", args.bind))?;

    info!("Listening on {}", args.bind);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_name_check_ignores_case() {
        assert!(is_pdf_name("report.pdf"));
        assert!(is_pdf_name("SCAN.PDF"));
        assert!(!is_pdf_name("notes.txt"));
        assert!(!is_pdf_name("pdf"));
        assert!(!is_pdf_name(""));
    }

    #[test]
    fn error_body_carries_detail() {
        let resp = bad_request("Only PDF files are supported.").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = processing_failed("boom").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let not_pdf = SummaryError::NotAPdf {
            source_name: "x.pdf".to_string(),
            magic: b"hell".to_vec(),
        };
        let resp = error_response(&not_pdf).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let corrupt = SummaryError::CorruptPdf {
            source_name: "x.pdf".to_string(),
            detail: "bad xref".to_string(),
        };
        let resp = error_response(&corrupt).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn pdf_named_upload_with_text_body_is_rejected_as_400() {
        let config = SummaryConfig::default();
        let err = summarize_bytes(b"hello".to_vec(), "x.pdf", &config)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let resp = error_response(&err).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn default_args() {
        let args = Args::try_parse_from(["pdfsum-server"]).unwrap();
        assert_eq!(args.bind, "0.0.0.0:8000");
        assert_eq!(args.max_upload_mb, 50);
    }
}
