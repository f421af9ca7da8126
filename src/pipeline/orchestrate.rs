//! Summarisation orchestrator: page records in, page summaries out.
//!
//! For every page, in this order:
//!
//! 1. non-empty text → [`chunk_text`] → one `summarize_text` call per chunk →
//!    [`clean_summary`] → joined with `\n`
//! 2. every image → analyse + PNG-encode on the blocking pool →
//!    one `analyze_image` call → [`ImageSummary`]
//! 3. [`combined_short`] preview for the table of contents
//!
//! Pages run concurrently through `buffer_unordered(concurrency)`; within a
//! page the calls are sequential. Results are sorted by `page_no` before
//! they are returned, so the output order never depends on scheduling.
//!
//! A failed call never aborts the page: the chunk or image gets a
//! placeholder and a [`UnitError`] is added to the page's `errors`.

use crate::config::SummaryConfig;
use crate::error::{ModelError, OcrError, UnitError};
use crate::output::{ImageMetadata, ImageSummary, PageRecord, PageSummaryRecord};
use crate::pipeline::analyze::ImageAnalyzer;
use crate::pipeline::chunk::chunk_text;
use crate::pipeline::encode::encode_png;
use crate::pipeline::llm::{ModelUsage, VisionModel};
use crate::pipeline::postprocess::clean_summary;
use futures::stream::{self, StreamExt};
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Stands in for the summary of a chunk whose model call failed.
pub const CHUNK_PLACEHOLDER: &str = "[Summary unavailable for this part of the page]";

/// Stands in for the description of an image whose model call failed.
pub const IMAGE_PLACEHOLDER: &str = "[Image description unavailable]";

/// Model-call counters of a summariser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub attempted: usize,
    pub failed: usize,
}

/// Drives chunking, image analysis and model calls for a document.
pub struct Summarizer<M: VisionModel> {
    model: M,
    analyzer: ImageAnalyzer,
    config: SummaryConfig,
    attempted: AtomicUsize,
    failed: AtomicUsize,
}

impl<M: VisionModel> Summarizer<M> {
    pub fn new(model: M, analyzer: ImageAnalyzer, config: SummaryConfig) -> Self {
        Self {
            model,
            analyzer,
            config,
            attempted: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Model calls made so far and how many of them failed.
    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            attempted: self.attempted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Token usage reported by the model.
    pub fn usage(&self) -> ModelUsage {
        self.model.usage()
    }

    /// Summarise every page. The result has one record per input record,
    /// in ascending `page_no` order.
    pub async fn summarize_pages(&self, records: Vec<PageRecord>) -> Vec<PageSummaryRecord> {
        let total = records.len();
        info!(
            "Summarising {} pages (concurrency {})",
            total, self.config.concurrency
        );

        let mut pages: Vec<PageSummaryRecord> = stream::iter(
            records
                .into_iter()
                .map(|record| self.summarize_page(record, total)),
        )
        .buffer_unordered(self.config.concurrency.max(1))
        .collect()
        .await;

        pages.sort_by_key(|p| p.page_no);

        let degraded = pages.iter().filter(|p| p.is_degraded()).count();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_summary_complete(total, degraded);
        }
        info!("Summarised {} pages, {} degraded", total, degraded);
        pages
    }

    /// Summarise a single page.
    pub async fn summarize_page(&self, record: PageRecord, total: usize) -> PageSummaryRecord {
        let PageRecord {
            page_no,
            text,
            images,
            was_scanned,
            warnings,
        } = record;

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_page_start(page_no, total);
            for w in &warnings {
                cb.on_unit_error(page_no, total, w.to_string());
            }
        }

        let mut errors = warnings;
        let image_count = images.len();

        let text_summary = if text.trim().is_empty() {
            String::new()
        } else {
            self.summarize_text(page_no, total, &text, &mut errors).await
        };

        let mut image_summaries = Vec::with_capacity(image_count);
        for (index, image) in images.into_iter().enumerate() {
            let summary = self
                .summarize_image(page_no, total, index, image, &mut errors)
                .await;
            image_summaries.push(summary);
        }

        let combined_short = combined_short(&text_summary, &image_summaries);

        debug!(
            "Page {}: {} chars of summary, {} images, {} errors",
            page_no,
            text_summary.len(),
            image_count,
            errors.len()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_page_complete(page_no, total, image_count);
        }

        PageSummaryRecord {
            page_no,
            text_summary,
            image_summaries,
            combined_short,
            was_scanned,
            errors,
        }
    }

    async fn summarize_text(
        &self,
        page_no: usize,
        total: usize,
        text: &str,
        errors: &mut Vec<UnitError>,
    ) -> String {
        let chunks = chunk_text(text, self.config.max_chunk_chars);
        debug!("Page {}: {} text chunk(s)", page_no, chunks.len());

        let mut parts = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            self.attempted.fetch_add(1, Ordering::Relaxed);
            match self.model.summarize_text(chunk).await {
                Ok(summary) => parts.push(clean_summary(&summary)),
                Err(e) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    let err = UnitError::ChunkFailed {
                        page: page_no,
                        chunk: index,
                        detail: e.to_string(),
                    };
                    self.record(total, err, errors);
                    parts.push(CHUNK_PLACEHOLDER.to_string());
                }
            }
        }
        parts.join("\n")
    }

    async fn summarize_image(
        &self,
        page_no: usize,
        total: usize,
        index: usize,
        image: RgbImage,
        errors: &mut Vec<UnitError>,
    ) -> ImageSummary {
        let (meta, ocr_err, png) = self.prepare_image(image).await;

        if let Some(e) = ocr_err {
            let err = UnitError::OcrFailed {
                page: page_no,
                image: index,
                detail: e.to_string(),
            };
            self.record(total, err, errors);
        }

        let described = match png {
            Ok(png) => {
                self.attempted.fetch_add(1, Ordering::Relaxed);
                let result = self.model.analyze_image(&png).await;
                if result.is_err() {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
            Err(e) => Err(e),
        };

        let description = match described {
            Ok(d) => clean_summary(&d),
            Err(e) => {
                let err = UnitError::ImageDescribeFailed {
                    page: page_no,
                    image: index,
                    detail: e.to_string(),
                };
                self.record(total, err, errors);
                IMAGE_PLACEHOLDER.to_string()
            }
        };

        ImageSummary { meta, description }
    }

    /// Analyse and PNG-encode an image on the blocking pool.
    async fn prepare_image(
        &self,
        image: RgbImage,
    ) -> (ImageMetadata, Option<OcrError>, Result<Vec<u8>, ModelError>) {
        let analyzer = self.analyzer.clone();
        let size = image.dimensions();
        let task = tokio::task::spawn_blocking(move || {
            let (meta, ocr_err) = analyzer.analyze(&image);
            let png = encode_png(&image).map_err(|e| ModelError::Request(e.to_string()));
            (meta, ocr_err, png)
        });

        match task.await {
            Ok(prepared) => prepared,
            Err(e) => (
                ImageMetadata {
                    ocr_text: String::new(),
                    is_chart: false,
                    size,
                },
                None,
                Err(ModelError::Request(format!("image task panicked: {e}"))),
            ),
        }
    }

    fn record(&self, total: usize, err: UnitError, errors: &mut Vec<UnitError>) {
        warn!("{}", err);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_unit_error(err.page(), total, err.to_string());
        }
        errors.push(err);
    }
}

/// One-line preview of a page for the table of contents.
///
/// The first line of the text summary, then ` | Image: ` and the first line
/// of the first image description (or `image` when that description is
/// empty). Empty when the page has neither.
pub fn combined_short(text_summary: &str, images: &[ImageSummary]) -> String {
    let mut short = String::new();
    if !text_summary.is_empty() {
        short.push_str(text_summary.split('\n').next().unwrap_or_default());
    }
    if let Some(first) = images.first() {
        short.push_str(" | Image: ");
        if first.description.is_empty() {
            short.push_str("image");
        } else {
            short.push_str(first.description.split('\n').next().unwrap_or_default());
        }
    }
    short
}
