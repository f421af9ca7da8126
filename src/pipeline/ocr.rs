//! OCR engines.
//!
//! The analyser only needs "grey image in, text out", so the engine is a
//! trait. [`TesseractCli`] shells out to the `tesseract` binary; [`NoOcr`]
//! is used when OCR is disabled and in tests.

use crate::error::OcrError;
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Recognises text in a (binarised) greyscale image.
///
/// Implementations are called from blocking worker threads and must be
/// shareable across them.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Engine that never recognises anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
        Ok(String::new())
    }
}

/// Runs `tesseract <png> stdout -l <lang>` per image.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(binary: Option<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from("tesseract")),
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        // tesseract reads from a path; the file is removed on drop.
        let tmp = tempfile::Builder::new()
            .prefix("pdfsum-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(tmp.path(), image::ImageFormat::Png)?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|source| OcrError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(
            "OCR {}x{} → {} chars",
            image.width(),
            image.height(),
            text.chars().count()
        );
        Ok(text)
    }
}
