//! Pipeline stages for PDF summarisation.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. The stages that talk to native or remote collaborators (pdfium,
//! tesseract, the LLM) sit behind narrow functions or traits so the rest of
//! the pipeline can run against test doubles.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ orchestrate ─────────────────────▶ layout ──▶ render
//! (bytes)   (pdfium)     ├─ chunk    (text budget)          (pure)     (pdfium)
//!                        ├─ analyze  (OCR + chart flag)
//!                        ├─ encode   (PNG)
//!                        ├─ llm      (VLM, retry/timeout)
//!                        └─ postprocess (cleanup)
//! ```
//!
//! 1. [`input`]: load a local path, URL, or buffer and check the `%PDF` magic
//! 2. [`extract`]: text layer, embedded images, scanned-page renders
//! 3. [`orchestrate`]: drive chunking, analysis and model calls per page
//! 4. [`layout`]: place the table of contents and page sections on A4 pages
//! 5. [`render`]: draw the layout into a new PDF

pub mod analyze;
pub mod chunk;
pub mod encode;
pub mod extract;
pub mod input;
pub mod layout;
pub mod llm;
pub mod ocr;
pub mod orchestrate;
pub mod postprocess;
pub mod render;
