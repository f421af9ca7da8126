//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! pdfium loads documents straight from a byte slice, so every input form
//! (local file, HTTP download, upload buffer) ends up as a `Vec<u8>` plus a
//! display name used in the report header. The `%PDF` magic is checked here
//! so callers get a meaningful error rather than a pdfium parse failure.

use crate::error::SummaryError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A PDF loaded into memory.
#[derive(Debug, Clone)]
pub struct LoadedPdf {
    /// Name shown in the report header (file name or last URL segment).
    pub source_name: String,
    /// Raw PDF bytes, magic already validated.
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input string into memory.
///
/// URLs are downloaded with the given timeout; anything else is read as a
/// local path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<LoadedPdf, SummaryError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Reject buffers that do not start with `%PDF`.
pub fn validate_pdf_magic(source_name: &str, bytes: &[u8]) -> Result<(), SummaryError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(SummaryError::NotAPdf {
            source_name: source_name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// The base name of a path, falling back to the whole string.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_local(path_str: &str) -> Result<LoadedPdf, SummaryError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SummaryError::FileNotFound { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SummaryError::PermissionDenied { path });
        }
        Err(e) => {
            return Err(SummaryError::InvalidInput {
                input: path_str.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let source_name = display_name(&path);
    validate_pdf_magic(&source_name, &bytes)?;

    debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(LoadedPdf { source_name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedPdf, SummaryError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SummaryError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SummaryError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SummaryError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SummaryError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SummaryError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    let source_name = filename_from_url(url);
    validate_pdf_magic(&source_name, &bytes)?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(LoadedPdf { source_name, bytes })
}

/// Last path segment of the URL if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
