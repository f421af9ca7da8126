//! Progress-callback trait for per-page summarisation events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as the pipeline extracts and summarises each page.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf_summary::{SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_no: usize, total_pages: usize, image_count: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} images)", page_no, total_pages, image_count);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(counter as Arc<dyn SummaryProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the summarisation pipeline as it processes each page.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` pages are
/// summarised concurrently and events for different pages may interleave.
/// All methods have no-op defaults.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called once after extraction, before any model call.
    fn on_extraction_complete(&self, total_pages: usize, scanned_pages: usize) {
        let _ = (total_pages, scanned_pages);
    }

    /// Called before the first model call of a page.
    fn on_page_start(&self, page_no: usize, total_pages: usize) {
        let _ = (page_no, total_pages);
    }

    /// Called once a page's summary record is complete (possibly with
    /// placeholders).
    fn on_page_complete(&self, page_no: usize, total_pages: usize, image_count: usize) {
        let _ = (page_no, total_pages, image_count);
    }

    /// Called for every chunk, image or OCR failure on a page.
    fn on_unit_error(&self, page_no: usize, total_pages: usize, error: String) {
        let _ = (page_no, total_pages, error);
    }

    /// Called once after all pages were summarised.
    ///
    /// * `degraded_pages`: pages with at least one unit error
    fn on_summary_complete(&self, total_pages: usize, degraded_pages: usize) {
        let _ = (total_pages, degraded_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        degraded: AtomicUsize,
    }

    impl SummaryProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_no: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_no: usize, _total_pages: usize, _image_count: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_error(&self, _page_no: usize, _total_pages: usize, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_summary_complete(&self, _total_pages: usize, degraded_pages: usize) {
            self.degraded.store(degraded_pages, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_complete(5, 1);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 2);
        cb.on_unit_error(2, 5, "some error".into());
        cb.on_summary_complete(5, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 0);
        tracker.on_page_start(2, 2);
        tracker.on_unit_error(2, 2, "image 0 timed out".into());
        tracker.on_page_complete(2, 2, 1);
        tracker.on_summary_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.degraded.load(Ordering::SeqCst), 1);
    }
}
