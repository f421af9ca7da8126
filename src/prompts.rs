//! Prompts sent to the language model.
//!
//! Callers can override both via [`crate::config::SummaryConfig::text_prompt`]
//! and [`crate::config::SummaryConfig::image_prompt`]; the constants here are
//! used only when no override is provided.

/// Instruction prepended to every text chunk.
pub const DEFAULT_TEXT_PROMPT: &str = "Summarize this text clearly and concisely.

Rules:
- Plain text only: no Markdown headings, bold markers or tables
- Keep key facts, figures and names
- Do not add commentary about the task itself";

/// Instruction sent with every page image.
pub const DEFAULT_IMAGE_PROMPT: &str = "Describe this image in detail for a PDF report.

If it is a chart or diagram, state what it plots, its axes and the main trend.
If it is a scanned page, summarize its text content.
Plain text only: no Markdown.";

/// Build the user message for one text chunk.
///
/// The chunk is fenced with triple quotes so instructions inside the
/// document cannot be mistaken for the prompt.
pub fn text_request(prompt: &str, chunk: &str) -> String {
    format!("{prompt}\n\n\"\"\"\n{chunk}\n\"\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_embeds_chunk() {
        let msg = text_request(DEFAULT_TEXT_PROMPT, "The quick brown fox.");
        assert!(msg.starts_with("Summarize this text"));
        assert!(msg.contains("\"\"\"\nThe quick brown fox.\n\"\"\""));
    }
}
