//! End-to-end tests for edgequake-pdf-summary.
//!
//! These tests need the pdfium library (downloaded on first use) and are
//! gated behind the `E2E_ENABLED` environment variable so they do not run
//! in CI unless explicitly requested. Input PDFs are generated on the fly
//! with the report renderer, so no fixtures are needed.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! The live-LLM test additionally needs OPENAI_API_KEY (or another
//! provider key) and tesseract on PATH.

use edgequake_pdf_summary::pipeline::extract::{extract_pages, pdfium, ExtractOptions};
use edgequake_pdf_summary::pipeline::input::LoadedPdf;
use edgequake_pdf_summary::pipeline::layout::{
    FontStyle, ReportDocument, ReportPage, TextRun, PAGE_HEIGHT, PAGE_WIDTH,
};
use edgequake_pdf_summary::pipeline::render::write_pdf;
use edgequake_pdf_summary::{
    summarize_bytes, summarize_with, ErrorKind, ImageAnalyzer, ModelError, SummaryConfig,
    VisionModel,
};
use image::{DynamicImage, Rgb, RgbImage};
use pdfium_render::prelude::*;

const PARAGRAPH: &str = "A short paragraph of text that sits on the first page of the document.";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// Two-page PDF: page 1 has a text layer, page 2 is blank.
fn text_and_blank_pdf() -> Vec<u8> {
    let doc = ReportDocument {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        pages: vec![
            ReportPage {
                runs: vec![TextRun {
                    x: 72.0,
                    y: 700.0,
                    size: 12.0,
                    style: FontStyle::Regular,
                    text: PARAGRAPH.to_string(),
                }],
            },
            ReportPage::default(),
        ],
    };
    write_pdf(&doc).expect("write_pdf should build the fixture")
}

fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
}

fn add_image(page: &mut PdfPage<'_>, image: &DynamicImage, x: f32, y: f32) {
    page.objects_mut()
        .create_image_object(
            PdfPoints::new(x),
            PdfPoints::new(y),
            image,
            Some(PdfPoints::new(image.width() as f32)),
            Some(PdfPoints::new(image.height() as f32)),
        )
        .expect("create_image_object");
}

/// Page 1: a full paragraph plus a 60×40 and a 30×50 image.
/// Page 2: a caption too short to count as text plus one 80×20 image.
fn pages_with_images_pdf() -> Vec<u8> {
    let pdfium = pdfium().expect("bind pdfium");
    let mut document = pdfium.create_new_pdf().expect("create_new_pdf");
    let font = document.fonts_mut().helvetica();

    let mut first = document
        .pages_mut()
        .create_page_at_end(PdfPagePaperSize::a4())
        .expect("page 1");
    first
        .objects_mut()
        .create_text_object(
            PdfPoints::new(72.0),
            PdfPoints::new(760.0),
            PARAGRAPH,
            font,
            PdfPoints::new(12.0),
        )
        .expect("text");
    add_image(&mut first, &solid(60, 40, [200, 30, 30]), 72.0, 600.0);
    add_image(&mut first, &solid(30, 50, [30, 30, 200]), 200.0, 600.0);

    let mut second = document
        .pages_mut()
        .create_page_at_end(PdfPagePaperSize::a4())
        .expect("page 2");
    second
        .objects_mut()
        .create_text_object(
            PdfPoints::new(72.0),
            PdfPoints::new(760.0),
            "Fig. 1",
            font,
            PdfPoints::new(12.0),
        )
        .expect("caption");
    add_image(&mut second, &solid(80, 20, [30, 160, 30]), 72.0, 600.0);

    document.save_to_bytes().expect("save fixture")
}

/// One page whose only image sits inside a form XObject, next to a
/// paragraph of text.
fn image_in_form_xobject_pdf() -> Vec<u8> {
    let pdfium = pdfium().expect("bind pdfium");

    let mut source = pdfium.create_new_pdf().expect("source doc");
    let mut source_page = source
        .pages_mut()
        .create_page_at_end(PdfPagePaperSize::a4())
        .expect("source page");
    add_image(&mut source_page, &solid(50, 25, [90, 90, 90]), 100.0, 100.0);

    let mut target = pdfium.create_new_pdf().expect("target doc");
    let form = source_page
        .objects()
        .copy_into_x_object_form_object(&mut target)
        .expect("form xobject");

    let font = target.fonts_mut().helvetica();
    let mut page = target
        .pages_mut()
        .create_page_at_end(PdfPagePaperSize::a4())
        .expect("target page");
    page.objects_mut()
        .create_text_object(
            PdfPoints::new(72.0),
            PdfPoints::new(760.0),
            PARAGRAPH,
            font,
            PdfPoints::new(12.0),
        )
        .expect("text");
    page.objects_mut().add_object(form).expect("add form");

    target.save_to_bytes().expect("save fixture")
}

/// Echoes the first words of each chunk; describes every image the same way.
struct EchoModel;

impl VisionModel for EchoModel {
    async fn summarize_text(&self, text: &str) -> Result<String, ModelError> {
        let head: Vec<&str> = text.split_whitespace().take(4).collect();
        Ok(format!("About: {}", head.join(" ")))
    }

    async fn analyze_image(&self, _png: &[u8]) -> Result<String, ModelError> {
        Ok("An empty white page.".to_string())
    }
}

// ── Extraction (pdfium, no LLM) ──────────────────────────────────────────────

#[test]
fn test_extract_text_page_and_scanned_page() {
    e2e_skip_unless_ready!();

    let bytes = text_and_blank_pdf();
    assert!(bytes.starts_with(b"%PDF"));

    let pages = extract_pages(&bytes, &ExtractOptions::default()).expect("extract_pages");
    assert_eq!(pages.len(), 2);

    let first = &pages[0];
    assert_eq!(first.page_no, 1);
    assert!(first.text.contains("short paragraph"), "got: {:?}", first.text);
    assert!(!first.was_scanned);
    assert!(first.images.is_empty());

    let second = &pages[1];
    assert_eq!(second.page_no, 2);
    assert!(second.text.is_empty());
    assert!(second.was_scanned);
    assert_eq!(second.images.len(), 1, "blank page is rasterised once");

    // A4 at 200 DPI is about 1654 × 2339 px.
    let (w, h) = second.images[0].dimensions();
    assert!((1640..=1670).contains(&w), "width {w}");
    assert!((2320..=2350).contains(&h), "height {h}");
    println!("✓ scanned render {w}×{h}");
}

#[test]
fn test_extract_without_scan_fallback() {
    e2e_skip_unless_ready!();

    let opts = ExtractOptions {
        ocr_on_fail: false,
        ..Default::default()
    };
    let pages = extract_pages(&text_and_blank_pdf(), &opts).expect("extract_pages");

    assert!(!pages[1].was_scanned);
    assert!(pages[1].images.is_empty());
}

#[test]
fn test_extract_corrupt_pdf() {
    e2e_skip_unless_ready!();

    let err = extract_pages(b"%PDF-1.7\nthis is not a pdf body", &ExtractOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Extraction);
    println!("✓ corrupt PDF rejected: {err}");
}

#[test]
fn test_extract_embedded_images_in_page_order() {
    e2e_skip_unless_ready!();

    let pages = extract_pages(&pages_with_images_pdf(), &ExtractOptions::default())
        .expect("extract_pages");
    assert_eq!(pages.len(), 2);

    let first = &pages[0];
    assert!(!first.was_scanned);
    assert!(first.warnings.is_empty(), "{:?}", first.warnings);
    let sizes: Vec<(u32, u32)> = first.images.iter().map(|i| i.dimensions()).collect();
    assert_eq!(sizes, vec![(60, 40), (30, 50)]);
}

#[test]
fn test_scanned_render_precedes_embedded_images() {
    e2e_skip_unless_ready!();

    let pages = extract_pages(&pages_with_images_pdf(), &ExtractOptions::default())
        .expect("extract_pages");
    let second = &pages[1];

    assert!(second.was_scanned, "\"Fig. 1\" is below the text threshold");
    assert_eq!(second.images.len(), 2);
    let (w, h) = second.images[0].dimensions();
    assert!((1640..=1670).contains(&w) && (2320..=2350).contains(&h), "render {w}×{h}");
    assert_eq!(second.images[1].dimensions(), (80, 20));
}

#[test]
fn test_images_inside_form_xobjects_are_found() {
    e2e_skip_unless_ready!();

    let pages = extract_pages(&image_in_form_xobject_pdf(), &ExtractOptions::default())
        .expect("extract_pages");

    assert_eq!(pages.len(), 1);
    assert!(!pages[0].was_scanned);
    let sizes: Vec<(u32, u32)> = pages[0].images.iter().map(|i| i.dimensions()).collect();
    assert_eq!(sizes, vec![(50, 25)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_extractions_each_bind_pdfium() {
    e2e_skip_unless_ready!();

    let bytes = text_and_blank_pdf();
    let a = bytes.clone();
    let b = bytes;
    let first = tokio::task::spawn_blocking(move || extract_pages(&a, &ExtractOptions::default()));
    let second = tokio::task::spawn_blocking(move || extract_pages(&b, &ExtractOptions::default()));

    let (first, second) = tokio::join!(first, second);
    let first = first.expect("join").expect("first extraction");
    let second = second.expect("join").expect("second extraction");
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);

    // A third run on this thread rebinds after both are gone.
    let third = extract_pages(&pages_with_images_pdf(), &ExtractOptions::default())
        .expect("rebinding after drop");
    assert_eq!(third.len(), 2);
}

// ── Full pipeline with a local model ─────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_full_run_with_local_model() {
    e2e_skip_unless_ready!();

    let config = SummaryConfig::builder()
        .ocr_enabled(false)
        .concurrency(2)
        .build()
        .unwrap();
    let pdf = LoadedPdf {
        source_name: "fixture.pdf".to_string(),
        bytes: text_and_blank_pdf(),
    };

    let output = summarize_with(pdf, EchoModel, ImageAnalyzer::default(), &config)
        .await
        .expect("summarize_with should succeed");

    assert_eq!(output.pages.len(), 2);
    assert_eq!(output.pages[0].text_summary, "About: A short paragraph of");
    assert!(output.pages[1].text_summary.is_empty());
    assert_eq!(output.pages[1].combined_short, " | Image: An empty white page.");

    let stats = &output.stats;
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.scanned_pages, 1);
    assert_eq!(stats.model_calls, 2);
    assert_eq!(stats.failed_calls, 0);
    assert_eq!(stats.report_pages, 3, "TOC page + one section per page");

    // The report itself is a readable PDF with the expected sections.
    assert!(output.report.starts_with(b"%PDF"));
    let opts = ExtractOptions {
        ocr_on_fail: false,
        ..Default::default()
    };
    let report = extract_pages(&output.report, &opts).expect("report must parse");
    assert_eq!(report.len(), 3);
    assert!(report[0].text.contains("Auto PDF Summary - Source: fixture.pdf"));
    assert!(report[0].text.contains("Table of contents"));
    assert!(report[1].text.contains("Page 1 Summary"));
    assert!(report[2].text.contains("Page 2 Summary"));
    assert!(report[2].text.contains("Image(s) analysis:"));
    println!("✓ report: {} bytes, {} pages", output.report.len(), report.len());
}

// ── Live LLM ─────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_live_llm_summary() {
    e2e_skip_unless_ready!();
    if std::env::var("OPENAI_API_KEY").is_err() {
        println!("SKIP — OPENAI_API_KEY not set");
        return;
    }

    let config = SummaryConfig::builder()
        .provider_name("openai")
        .model("gpt-4.1-nano")
        .ocr_enabled(false)
        .build()
        .unwrap();

    let output = summarize_bytes(text_and_blank_pdf(), "live.pdf", &config)
        .await
        .expect("live summary should succeed");

    assert_eq!(output.pages.len(), 2);
    assert!(!output.pages[0].text_summary.trim().is_empty());
    assert!(output.report.starts_with(b"%PDF"));
    println!(
        "✓ live: {} calls, {} in / {} out tokens",
        output.stats.model_calls, output.stats.total_input_tokens, output.stats.total_output_tokens
    );
}
