//! Post-processing: deterministic cleanup of model-generated summaries.
//!
//! The report is drawn as plain text with the PDF standard fonts, so anything
//! the model adds for a Markdown renderer is noise on the page:
//!
//! - ` ```text ... ``` ` fences around the whole answer
//! - `## Heading` markers and `**bold**` / `__bold__` emphasis
//! - Windows-style `\r\n` line endings and trailing spaces
//! - Runs of blank lines
//! - Zero-width characters and typographic punctuation that the standard
//!   fonts lack glyphs for
//!
//! Each rule is a pure `&str → String` function, applied in a fixed order:
//! fences before line-ending normalisation so the fence regex sees the raw
//! answer, markup stripping before blank-line collapsing so emptied lines
//! are collapsed too.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model answer.
///
/// Rules (applied in order):
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip Markdown heading markers and emphasis
/// 4. Trim trailing whitespace per line
/// 5. Collapse 2+ consecutive blank lines down to 1
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Replace typographic punctuation with ASCII
/// 8. Trim the result
pub fn clean_summary(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = strip_markdown_markup(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    let s = ascii_punctuation(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*?)\r?\n```\s*$").expect("valid fence regex")
});

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip Markdown markup ────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+").expect("valid heading regex"));
static RE_STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*\*|__)(\S(?:.*?\S)?)(\*\*|__)").expect("valid emphasis regex"));

fn strip_markdown_markup(input: &str) -> String {
    let s = RE_HEADING.replace_all(input, "");
    RE_STRONG.replace_all(&s, "$2").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 7: ASCII punctuation ────────────────────────────────────────────────

fn ascii_punctuation(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => {
                out.push('-')
            }
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' | '\u{25CF}' | '\u{25AA}' => out.push('*'),
            '\u{00A0}' | '\u{202F}' | '\u{2009}' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
