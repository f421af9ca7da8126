//! Text chunking under a character budget.
//!
//! Long pages are summarised piecewise so each request stays inside the
//! model's context window. Chunks prefer to end on a line break or a period
//! so the model never sees half a sentence, but only when the boundary is in
//! the second half of the window; otherwise the window is cut at the budget.
//!
//! The budget counts `char`s, not bytes, and cuts always land on char
//! boundaries. Concatenating the chunks reproduces the input exactly.

/// Split `text` into ordered, non-overlapping chunks of at most `max_chars`
/// characters.
///
/// Text that fits the budget (including the empty string) is returned as a
/// single chunk. A `max_chars` of 0 is treated as 1.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);

    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = offsets.len() - 1;

    if total_chars <= max_chars {
        return vec![text];
    }

    let chars: Vec<char> = text.chars().collect();
    let min_break = max_chars / 2;
    let mut chunks = Vec::with_capacity(total_chars / max_chars + 1);
    let mut start = 0;

    while start < total_chars {
        let remaining = total_chars - start;
        if remaining <= max_chars {
            chunks.push(&text[offsets[start]..]);
            break;
        }

        let window = &chars[start..start + max_chars];
        let cut = window
            .iter()
            .rposition(|&c| c == '\n' || c == '.')
            .filter(|&pos| pos >= min_break)
            .map(|pos| pos + 1)
            .unwrap_or(max_chars);

        let end = start + cut;
        chunks.push(&text[offsets[start]..offsets[end]]);
        start = end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(chunk_text("hello", 10), vec!["hello"]);
        assert_eq!(chunk_text("", 10), vec![""]);
        assert_eq!(chunk_text("exactly10!", 10), vec!["exactly10!"]);
    }

    #[test]
    fn breaks_after_period_in_second_half() {
        // Window of 10 chars: "aaaaaaa. b" → period at index 7 ≥ 5.
        let text = "aaaaaaa. bbbbbbbbbbbb";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks[0], "aaaaaaa.");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn breaks_after_newline() {
        let text = "line one\nline two is longer";
        let chunks = chunk_text(text, 12);
        assert_eq!(chunks[0], "line one\n");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn early_boundary_forces_hard_break() {
        // Only boundary is at index 1, before the 50 % mark.
        let text = "a.bcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks[0], "a.bcdefghi");
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn boundary_exactly_at_half_is_accepted() {
        // Period at index 5 of a 10-char window.
        let text = "abcde.fghijklmnop";
        assert_eq!(chunk_text(text, 10)[0], "abcde.");
    }

    #[test]
    fn reconstructs_and_respects_budget() {
        let text = "Sentence one. Sentence two is here.\nA new line follows. ".repeat(200);
        for budget in [7, 50, 333, 1000] {
            let chunks = chunk_text(&text, budget);
            assert_eq!(chunks.concat(), text, "budget {budget}");
            assert!(
                chunks.iter().all(|c| c.chars().count() <= budget),
                "budget {budget} exceeded"
            );
            assert!(chunks.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn multibyte_text_cuts_on_char_boundaries() {
        let text = "日本語のテキスト。".repeat(40);
        let chunks = chunk_text(&text, 25);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 25));
    }

    #[test]
    fn zero_budget_is_treated_as_one() {
        let chunks = chunk_text("abc", 0);
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn deterministic() {
        let text = "x. ".repeat(1000);
        assert_eq!(chunk_text(&text, 97), chunk_text(&text, 97));
    }
}
