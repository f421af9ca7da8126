//! Image analysis: OCR text and the "likely chart" heuristic.
//!
//! ```text
//! RgbImage ─▶ grey ─┬─▶ binarise (Otsu | fixed) ─▶ OcrEngine ─▶ ocr_text
//!                   └─▶ Canny(50,150) ─▶ edge density > threshold ─▶ is_chart
//! ```
//!
//! The chart flag is a hint for the reader, not a classifier: dense line
//! work (plots, diagrams, tables) produces many edge pixels while photos and
//! plain text produce fewer.
//!
//! Analysis is CPU-bound and may spawn a subprocess, so callers on the async
//! runtime go through [`ImageAnalyzer::analyze_async`].

use crate::config::{
    Binarization, SummaryConfig, CANNY_HIGH_THRESHOLD, CANNY_LOW_THRESHOLD,
    DEFAULT_CHART_EDGE_THRESHOLD,
};
use crate::error::OcrError;
use crate::output::ImageMetadata;
use crate::pipeline::ocr::{NoOcr, OcrEngine, TesseractCli};
use image::{GrayImage, RgbImage};
use std::sync::Arc;
use tracing::debug;

/// Derives [`ImageMetadata`] from an image.
#[derive(Clone)]
pub struct ImageAnalyzer {
    ocr: Arc<dyn OcrEngine>,
    binarization: Binarization,
    chart_edge_threshold: f32,
}

impl std::fmt::Debug for ImageAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAnalyzer")
            .field("binarization", &self.binarization)
            .field("chart_edge_threshold", &self.chart_edge_threshold)
            .finish_non_exhaustive()
    }
}

impl Default for ImageAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(NoOcr))
    }
}

impl ImageAnalyzer {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            ocr,
            binarization: Binarization::default(),
            chart_edge_threshold: DEFAULT_CHART_EDGE_THRESHOLD,
        }
    }

    /// Analyser configured from a [`SummaryConfig`]: tesseract when OCR is
    /// enabled, [`NoOcr`] otherwise.
    pub fn from_config(config: &SummaryConfig) -> Self {
        let ocr: Arc<dyn OcrEngine> = if config.ocr_enabled {
            Arc::new(TesseractCli::new(
                config.tesseract_path.clone(),
                config.ocr_language.clone(),
            ))
        } else {
            Arc::new(NoOcr)
        };
        Self::new(ocr)
            .with_binarization(config.binarization)
            .with_chart_edge_threshold(config.chart_edge_threshold)
    }

    pub fn with_binarization(mut self, b: Binarization) -> Self {
        self.binarization = b;
        self
    }

    pub fn with_chart_edge_threshold(mut self, fraction: f32) -> Self {
        self.chart_edge_threshold = fraction;
        self
    }

    /// Analyse one image.
    ///
    /// Never fails: an OCR failure leaves `ocr_text` empty and is returned
    /// alongside so the caller can record it.
    pub fn analyze(&self, image: &RgbImage) -> (ImageMetadata, Option<OcrError>) {
        let grey = image::imageops::grayscale(image);
        let is_chart = is_likely_chart(&grey, self.chart_edge_threshold);

        let (ocr_text, ocr_err) = match self.ocr.recognize(&binarize(&grey, self.binarization)) {
            Ok(text) => (text.trim().to_string(), None),
            Err(e) => (String::new(), Some(e)),
        };

        debug!(
            "Analysed {}x{} image: chart={}, ocr={} chars",
            image.width(),
            image.height(),
            is_chart,
            ocr_text.chars().count()
        );

        (
            ImageMetadata {
                ocr_text,
                is_chart,
                size: image.dimensions(),
            },
            ocr_err,
        )
    }

    /// [`analyze`](Self::analyze) on the blocking thread pool.
    pub async fn analyze_async(&self, image: RgbImage) -> (ImageMetadata, Option<OcrError>) {
        let analyzer = self.clone();
        let size = image.dimensions();
        match tokio::task::spawn_blocking(move || analyzer.analyze(&image)).await {
            Ok(result) => result,
            Err(e) => (
                ImageMetadata {
                    ocr_text: String::new(),
                    is_chart: false,
                    size,
                },
                Some(OcrError::Engine(format!("analysis task panicked: {e}"))),
            ),
        }
    }
}

/// Binarise a grey image: pixels above the level become white, the rest black.
pub fn binarize(grey: &GrayImage, mode: Binarization) -> GrayImage {
    let level = match mode {
        Binarization::Otsu => imageproc::contrast::otsu_level(grey),
        Binarization::Fixed(level) => level,
    };
    let mut out = grey.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > level { 255 } else { 0 };
    }
    out
}

/// Fraction of pixels marked as edges by Canny(50, 150). 0.0 for empty images.
pub fn edge_density(grey: &GrayImage) -> f32 {
    let total = grey.width() as u64 * grey.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let edges = imageproc::edges::canny(grey, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);
    let on = edges.pixels().filter(|p| p.0[0] > 0).count() as u64;
    on as f32 / total as f32
}

/// True when the edge density strictly exceeds `threshold`.
pub fn is_likely_chart(grey: &GrayImage, threshold: f32) -> bool {
    edge_density(grey) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedOcr(&'static str);
    impl OcrEngine for FixedOcr {
        fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingOcr;
    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            Err(OcrError::Engine("no language data".into()))
        }
    }

    /// Counts the grey (neither black nor white) pixels it was given.
    struct BinaryCheck(AtomicUsize);
    impl OcrEngine for BinaryCheck {
        fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
            let grey = image.pixels().filter(|p| p.0[0] != 0 && p.0[0] != 255).count();
            self.0.store(grey, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    fn grid(size: u32, step: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if x % step == 0 || y % step == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn blank_image_is_not_a_chart() {
        let grey = GrayImage::from_pixel(64, 64, Luma([255]));
        assert_eq!(edge_density(&grey), 0.0);
        assert!(!is_likely_chart(&grey, DEFAULT_CHART_EDGE_THRESHOLD));
    }

    #[test]
    fn dense_grid_is_a_chart() {
        let grey = image::imageops::grayscale(&grid(128, 6));
        assert!(edge_density(&grey) > DEFAULT_CHART_EDGE_THRESHOLD);
        assert!(is_likely_chart(&grey, DEFAULT_CHART_EDGE_THRESHOLD));
    }

    #[test]
    fn threshold_is_strict() {
        let grey = GrayImage::from_pixel(8, 8, Luma([128]));
        assert!(!is_likely_chart(&grey, 0.0));
    }

    #[test]
    fn empty_image_has_zero_density() {
        assert_eq!(edge_density(&GrayImage::new(0, 0)), 0.0);
    }

    #[test]
    fn fixed_binarization_splits_on_level() {
        let grey = GrayImage::from_fn(3, 1, |x, _| Luma([[199u8, 200, 201][x as usize]]));
        let out = binarize(&grey, Binarization::Fixed(200));
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 0);
        assert_eq!(out.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn otsu_output_is_binary() {
        let grey = GrayImage::from_fn(32, 32, |x, _| Luma([if x < 16 { 40 } else { 220 }]));
        let out = binarize(&grey, Binarization::Otsu);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(31, 0).0[0], 255);
    }

    #[test]
    fn analyze_reports_size_and_ocr_text() {
        let analyzer = ImageAnalyzer::new(Arc::new(FixedOcr("  Revenue 2023 ")));
        let (meta, err) = analyzer.analyze(&RgbImage::from_pixel(40, 20, Rgb([255, 255, 255])));
        assert!(err.is_none());
        assert_eq!(meta.size, (40, 20));
        assert_eq!(meta.ocr_text, "Revenue 2023");
        assert!(!meta.is_chart);
    }

    #[test]
    fn ocr_failure_yields_empty_text() {
        let analyzer = ImageAnalyzer::new(Arc::new(FailingOcr));
        let (meta, err) = analyzer.analyze(&grid(64, 4));
        assert_eq!(meta.ocr_text, "");
        assert!(meta.is_chart);
        assert!(matches!(err, Some(OcrError::Engine(_))));
    }

    #[test]
    fn ocr_receives_binarised_image() {
        let check = Arc::new(BinaryCheck(AtomicUsize::new(usize::MAX)));
        let analyzer = ImageAnalyzer::new(check.clone()).with_binarization(Binarization::Fixed(100));
        let img = RgbImage::from_fn(16, 16, |x, y| {
            let v = ((x * 16 + y) % 256) as u8;
            Rgb([v, v, v])
        });
        analyzer.analyze(&img);
        assert_eq!(check.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn async_analysis_matches_sync() {
        let analyzer = ImageAnalyzer::default();
        let img = grid(64, 5);
        let (sync_meta, _) = analyzer.analyze(&img);
        let (async_meta, _) = analyzer.analyze_async(img).await;
        assert_eq!(sync_meta, async_meta);
    }
}
