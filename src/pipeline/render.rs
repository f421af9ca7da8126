//! Report rendering: draw a [`ReportDocument`] into a new PDF with pdfium.
//!
//! Pages are A4, matching the layout constants. Every
//! [`TextRun`](crate::pipeline::layout::TextRun) becomes one text object in
//! one of the built-in Helvetica faces, so the report embeds no fonts. Like
//! extraction, this runs on the blocking pool.

use crate::error::SummaryError;
use crate::pipeline::extract::pdfium;
use crate::pipeline::layout::{FontStyle, ReportDocument};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Draw `doc` and return the PDF bytes.
pub fn write_pdf(doc: &ReportDocument) -> Result<Vec<u8>, SummaryError> {
    let pdfium = pdfium()?;
    let mut document = pdfium.create_new_pdf().map_err(render_err)?;

    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();
    let oblique = document.fonts_mut().helvetica_oblique();

    for (index, layout_page) in doc.pages.iter().enumerate() {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(render_err)?;

        for run in &layout_page.runs {
            let font = match run.style {
                FontStyle::Regular => regular,
                FontStyle::Bold => bold,
                FontStyle::Oblique => oblique,
            };
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(run.x),
                    PdfPoints::new(run.y),
                    &run.text,
                    font,
                    PdfPoints::new(run.size),
                )
                .map_err(render_err)?;
        }
        debug!("Report page {}: {} runs", index + 1, layout_page.runs.len());
    }

    let bytes = document.save_to_bytes().map_err(render_err)?;
    info!(
        "Rendered report: {} pages, {} bytes",
        doc.page_count(),
        bytes.len()
    );
    Ok(bytes)
}

/// [`write_pdf`] on the blocking thread pool.
pub async fn write_pdf_async(doc: ReportDocument) -> Result<Vec<u8>, SummaryError> {
    tokio::task::spawn_blocking(move || write_pdf(&doc))
        .await
        .map_err(|e| SummaryError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_err(e: PdfiumError) -> SummaryError {
    SummaryError::RenderFailed {
        detail: format!("{e:?}"),
    }
}
