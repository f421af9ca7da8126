//! Page extraction: text layer, embedded images and scanned-page renders.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with global state; `pdfium-render`'s
//! `thread_safe` feature takes a process-wide lock for as long as a
//! [`Pdfium`] binding is alive, so each call owns its binding and drops it
//! when done. Extraction is also CPU-heavy (image decoding, 200-DPI renders),
//! so it runs on the blocking pool and never on a Tokio worker thread.
//!
//! ## Scanned pages
//!
//! A page whose trimmed text layer is shorter than the threshold is most
//! likely a scan or a picture of text. Such pages are rasterised whole and
//! the render is put first in the image list, so the model sees the page as
//! a reader would. OCR is not run here; the analyser does that later for
//! every image alike.

use crate::config::{
    SummaryConfig, DEFAULT_MAX_RENDERED_PIXELS, DEFAULT_SCANNED_TEXT_THRESHOLD, DEFAULT_SCAN_DPI,
};
use crate::error::{SummaryError, UnitError};
use crate::output::PageRecord;
use image::RgbImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Bind pdfium, downloading the library on first use.
///
/// The binding holds the pdfium lock until dropped; never keep two alive on
/// one thread.
pub fn pdfium() -> Result<Pdfium, SummaryError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| SummaryError::PdfiumBindingFailed(e.to_string()))
}

/// Extraction settings, usually derived from a [`SummaryConfig`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Name used in error messages.
    pub source_name: String,
    pub ocr_on_fail: bool,
    pub scanned_text_threshold: usize,
    pub scan_dpi: u32,
    pub max_rendered_pixels: u32,
    pub password: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            source_name: "document.pdf".to_string(),
            ocr_on_fail: true,
            scanned_text_threshold: DEFAULT_SCANNED_TEXT_THRESHOLD,
            scan_dpi: DEFAULT_SCAN_DPI,
            max_rendered_pixels: DEFAULT_MAX_RENDERED_PIXELS,
            password: None,
        }
    }
}

impl ExtractOptions {
    pub fn from_config(source_name: impl Into<String>, config: &SummaryConfig) -> Self {
        Self {
            source_name: source_name.into(),
            ocr_on_fail: config.ocr_on_fail,
            scanned_text_threshold: config.scanned_text_threshold,
            scan_dpi: config.scan_dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }
}

/// Whether a page with this text layer should be rasterised.
pub fn is_scanned(text: &str, threshold: usize) -> bool {
    text.trim().chars().count() < threshold
}

/// Extract every page of the PDF in `bytes`, in page order.
///
/// Document-level failures (unparseable file, missing or wrong password,
/// no pdfium library) are fatal. Per-page problems are recorded in
/// [`PageRecord::warnings`] and the page is still returned.
pub fn extract_pages(bytes: &[u8], opts: &ExtractOptions) -> Result<Vec<PageRecord>, SummaryError> {
    let pdfium = pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, opts.password.as_deref())
        .map_err(|e| classify_load_error(&format!("{e:?}"), opts))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut records = Vec::with_capacity(pages.len() as usize);
    for (index, page) in pages.iter().enumerate() {
        records.push(extract_page(index + 1, &page, opts));
    }

    let scanned = records.iter().filter(|r| r.was_scanned).count();
    info!(
        "Extracted {} pages ({} scanned, {} images)",
        records.len(),
        scanned,
        records.iter().map(|r| r.images.len()).sum::<usize>()
    );
    Ok(records)
}

/// [`extract_pages`] on the blocking thread pool.
pub async fn extract_pages_async(
    bytes: Vec<u8>,
    opts: ExtractOptions,
) -> Result<Vec<PageRecord>, SummaryError> {
    tokio::task::spawn_blocking(move || extract_pages(&bytes, &opts))
        .await
        .map_err(|e| SummaryError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn extract_page(page_no: usize, page: &PdfPage<'_>, opts: &ExtractOptions) -> PageRecord {
    let mut warnings = Vec::new();

    let text = match page.text() {
        Ok(layer) => layer.all().trim().to_string(),
        Err(e) => {
            warn!("Page {}: text layer unreadable: {:?}", page_no, e);
            warnings.push(UnitError::TextLayerFailed {
                page: page_no,
                detail: format!("{e:?}"),
            });
            String::new()
        }
    };

    let mut images = Vec::new();
    let mut image_index = 0;
    for object in page.objects().iter() {
        collect_images(page_no, &object, &mut image_index, &mut images, &mut warnings);
    }

    let was_scanned = opts.ocr_on_fail && is_scanned(&text, opts.scanned_text_threshold);
    if was_scanned {
        match render_page(page, opts) {
            Ok(render) => {
                debug!(
                    "Page {}: rendered scan {}x{} px",
                    page_no,
                    render.width(),
                    render.height()
                );
                images.insert(0, render);
            }
            Err(detail) => {
                warn!("Page {}: full-page render failed: {}", page_no, detail);
                warnings.push(UnitError::PageRenderFailed {
                    page: page_no,
                    detail,
                });
            }
        }
    }

    debug!(
        "Page {}: {} chars, {} images, scanned={}",
        page_no,
        text.chars().count(),
        images.len(),
        was_scanned
    );

    PageRecord {
        page_no,
        text,
        images,
        was_scanned,
        warnings,
    }
}

/// Decode `object` if it is an image, or every image nested in it if it is
/// a form XObject. `image_index` counts images in content-stream order,
/// skipped ones included.
fn collect_images(
    page_no: usize,
    object: &PdfPageObject<'_>,
    image_index: &mut usize,
    images: &mut Vec<RgbImage>,
    warnings: &mut Vec<UnitError>,
) {
    if let Some(form) = object.as_x_object_form_object() {
        for child in form.iter() {
            collect_images(page_no, &child, image_index, images, warnings);
        }
        return;
    }
    let Some(image_object) = object.as_image_object() else {
        return;
    };
    match image_object.get_raw_image() {
        Ok(img) => images.push(img.to_rgb8()),
        Err(e) => {
            warn!("Page {}: skipping image {}: {:?}", page_no, image_index, e);
            warnings.push(UnitError::ImageDecodeFailed {
                page: page_no,
                image: *image_index,
                detail: format!("{e:?}"),
            });
        }
    }
    *image_index += 1;
}

/// Render the page at the scan DPI, with the longest edge capped.
fn render_page(page: &PdfPage<'_>, opts: &ExtractOptions) -> Result<RgbImage, String> {
    let max_px = opts.max_rendered_pixels as i32;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(opts.scan_dpi as f32 / 72.0)
        .set_maximum_width(max_px)
        .set_maximum_height(max_px);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("{e:?}"))?;
    Ok(bitmap.as_image().to_rgb8())
}

fn classify_load_error(detail: &str, opts: &ExtractOptions) -> SummaryError {
    if detail.contains("Password") || detail.contains("password") {
        if opts.password.is_some() {
            SummaryError::WrongPassword {
                source_name: opts.source_name.clone(),
            }
        } else {
            SummaryError::PasswordRequired {
                source_name: opts.source_name.clone(),
            }
        }
    } else {
        SummaryError::CorruptPdf {
            source_name: opts.source_name.clone(),
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_scanned() {
        assert!(is_scanned("", 30));
        assert!(is_scanned("   \n\t  ", 30));
        assert!(is_scanned("Figure 3", 30));
        assert!(!is_scanned(&"x".repeat(30), 30));
    }

    #[test]
    fn threshold_counts_trimmed_chars() {
        let padded = format!("   {}   ", "y".repeat(29));
        assert!(is_scanned(&padded, 30));
        assert!(!is_scanned("abc", 0));
    }

    #[test]
    fn password_errors_depend_on_supplied_password() {
        let opts = ExtractOptions::default();
        assert!(matches!(
            classify_load_error("PdfiumLibraryInternalError(PasswordError)", &opts),
            SummaryError::PasswordRequired { .. }
        ));

        let with_pwd = ExtractOptions {
            password: Some("hunter2".into()),
            ..ExtractOptions::default()
        };
        assert!(matches!(
            classify_load_error("PdfiumLibraryInternalError(PasswordError)", &with_pwd),
            SummaryError::WrongPassword { .. }
        ));
    }

    #[test]
    fn other_load_errors_are_corrupt() {
        let opts = ExtractOptions {
            source_name: "broken.pdf".into(),
            ..ExtractOptions::default()
        };
        match classify_load_error("PdfiumLibraryInternalError(FormatError)", &opts) {
            SummaryError::CorruptPdf { source_name, detail } => {
                assert_eq!(source_name, "broken.pdf");
                assert!(detail.contains("FormatError"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn options_follow_config() {
        let config = SummaryConfig::builder()
            .ocr_on_fail(false)
            .scan_dpi(300)
            .password("pw")
            .build()
            .unwrap();
        let opts = ExtractOptions::from_config("a.pdf", &config);
        assert!(!opts.ocr_on_fail);
        assert_eq!(opts.scan_dpi, 300);
        assert_eq!(opts.password.as_deref(), Some("pw"));
        assert_eq!(opts.source_name, "a.pdf");
    }
}
