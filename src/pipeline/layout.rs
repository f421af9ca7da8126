//! Report layout: page summaries → positioned text runs on A4 pages.
//!
//! Layout is pure: it decides what goes where and on which page, without
//! touching pdfium. [`crate::pipeline::render`] then draws each run as a
//! text object. Keeping the two apart lets pagination be unit-tested.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Auto PDF Summary - Source: x.pdf   date  │  page 1: header
//! │ Table of contents (page - short summary):│          + TOC
//! │ Page 1: ...                              │  (may spill over)
//! ├──────────────────────────────────────────┤
//! │ Page 1 Summary                           │  one section per record,
//! │ text summary, wrapped at 100 columns     │  each on a fresh page
//! │ Image(s) analysis:                       │
//! │   description, wrapped and indented      │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Coordinates are PDF points with the origin at the bottom-left corner.
//! The cursor starts one margin below the top edge; once it falls below
//! [`BOTTOM_LIMIT`] the next run goes on a new page.

use crate::output::PageSummaryRecord;
use chrono::{DateTime, Utc};

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.275_6;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 841.889_8;
/// 20 mm in points.
pub const MARGIN: f32 = 20.0 * 72.0 / 25.4;
/// Lowest baseline before a page break.
pub const BOTTOM_LIMIT: f32 = 50.0;
/// Wrap width of summary and description lines, in characters.
pub const WRAP_COLUMNS: usize = 100;
/// Characters of `combined_short` shown per table-of-contents line.
pub const TOC_PREVIEW_CHARS: usize = 120;
/// Horizontal indent of image descriptions.
const DESCRIPTION_INDENT: f32 = 8.0;

pub const NO_TEXT_PLACEHOLDER: &str = "(No extractable text on this page)";
pub const NO_IMAGES_NOTE: &str = "No images on this page.";

/// The three standard Helvetica faces used by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Oblique,
}

/// One line of text at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    /// Baseline, measured from the bottom edge.
    pub y: f32,
    pub size: f32,
    pub style: FontStyle,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPage {
    pub runs: Vec<TextRun>,
}

/// A fully paginated report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<ReportPage>,
}

impl ReportDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Index of the first page whose runs contain `needle`.
    pub fn find_page(&self, needle: &str) -> Option<usize> {
        self.pages
            .iter()
            .position(|p| p.runs.iter().any(|r| r.text.contains(needle)))
    }
}

/// Header information of a report.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// File name shown in the header (directories are stripped).
    pub source_name: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportMeta {
    /// Header for `source_name`, stamped with the current time.
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            generated_at: Utc::now(),
        }
    }

    pub fn timestamp(&self) -> String {
        self.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()
    }

    fn display_name(&self) -> &str {
        self.source_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_name)
    }
}

/// Approximate advance width of `text` in Helvetica.
///
/// Helvetica averages a little over half an em per character; this is only
/// used to right-align the short timestamp.
pub fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.55
}

/// Break one line of text into pieces of at most `width` characters.
///
/// Breaks at spaces where possible; a word longer than `width` is split
/// hard. An empty or all-space line yields no pieces.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split(' ').filter(|w| !w.is_empty()) {
        let mut word_chars: Vec<char> = word.chars().collect();

        // Room for " word" on the current line?
        let needed = if current_len == 0 {
            word_chars.len()
        } else {
            current_len + 1 + word_chars.len()
        };
        if needed <= width {
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word_chars.iter());
            current_len += word_chars.len();
            continue;
        }

        if current_len > 0 {
            out.push(std::mem::take(&mut current));
        }

        while word_chars.len() > width {
            let rest = word_chars.split_off(width);
            out.push(word_chars.iter().collect());
            word_chars = rest;
        }
        current.extend(word_chars.iter());
        current_len = word_chars.len();
    }

    if current_len > 0 {
        out.push(current);
    }
    out
}

struct Cursor {
    pages: Vec<ReportPage>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![ReportPage::default()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(ReportPage::default());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Start a section on a fresh page, reusing the current one if blank.
    fn begin_section(&mut self) {
        let blank = self.pages.last().is_none_or(|p| p.runs.is_empty());
        if blank {
            self.y = PAGE_HEIGHT - MARGIN;
        } else {
            self.new_page();
        }
    }

    fn draw_at(&mut self, x: f32, size: f32, style: FontStyle, text: impl Into<String>) {
        if self.y < BOTTOM_LIMIT {
            self.new_page();
        }
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.runs.push(TextRun {
                x,
                y,
                size,
                style,
                text: text.into(),
            });
        }
    }

    /// Draw at the left margin and move down by `advance`.
    fn line(&mut self, size: f32, style: FontStyle, text: impl Into<String>, advance: f32) {
        self.draw_at(MARGIN, size, style, text);
        self.y -= advance;
    }

    /// Draw every wrapped piece of `body`, one line each.
    fn paragraph(&mut self, body: &str, x: f32, size: f32, advance: f32) {
        for raw in body.split('\n') {
            for piece in wrap_line(raw, WRAP_COLUMNS) {
                self.draw_at(x, size, FontStyle::Regular, piece);
                self.y -= advance;
            }
        }
    }
}

/// Lay out the report for `records`.
///
/// Always produces at least one page (header and table of contents), plus
/// one section per record starting on its own page.
pub fn layout_report(records: &[PageSummaryRecord], meta: &ReportMeta) -> ReportDocument {
    let mut c = Cursor::new();

    // Header: title on the left, timestamp right-aligned on the same baseline.
    let stamp = meta.timestamp();
    c.draw_at(
        MARGIN,
        14.0,
        FontStyle::Bold,
        format!("Auto PDF Summary - Source: {}", meta.display_name()),
    );
    c.draw_at(
        PAGE_WIDTH - MARGIN - estimate_width(&stamp, 9.0),
        9.0,
        FontStyle::Regular,
        stamp,
    );
    c.y -= 15.0;

    c.line(
        11.0,
        FontStyle::Bold,
        "Table of contents (page - short summary):",
        12.0,
    );
    for rec in records {
        let preview: String = rec.combined_short.chars().take(TOC_PREVIEW_CHARS).collect();
        c.line(
            9.0,
            FontStyle::Regular,
            format!("Page {}: {}", rec.page_no, preview),
            10.0,
        );
    }

    for rec in records {
        c.begin_section();
        c.line(
            12.0,
            FontStyle::Bold,
            format!("Page {} Summary", rec.page_no),
            14.0,
        );

        if rec.text_summary.trim().is_empty() {
            c.line(10.0, FontStyle::Regular, NO_TEXT_PLACEHOLDER, 12.0);
        } else {
            c.paragraph(&rec.text_summary, MARGIN, 10.0, 10.0);
        }

        if rec.image_summaries.is_empty() {
            c.line(10.0, FontStyle::Regular, NO_IMAGES_NOTE, 12.0);
        } else {
            c.line(9.0, FontStyle::Oblique, "Image(s) analysis:", 12.0);
            for image in &rec.image_summaries {
                c.paragraph(&image.description, MARGIN + DESCRIPTION_INDENT, 9.0, 9.0);
            }
        }
    }

    ReportDocument {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        pages: c.pages,
    }
}
