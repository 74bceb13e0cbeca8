use crate::models::Slide;
use regex::Regex;
use std::sync::LazyLock;

/// Instruction used when a slide has a full body to explain.
pub const EXPLAIN_BODY: &str = "Provide a detailed explanation of this slide. Explain what it \
     teaches, what the key concepts mean, and how they relate to each other. Do not just \
     summarize - explain and elaborate on the meaning and significance. Be thorough and detailed:";

/// Instruction used when only summarized bullets are available.
pub const EXPLAIN_BULLETS: &str = "Provide a detailed explanation of this slide content. Explain \
     what it teaches, what the key concepts mean, and how they relate to each other. Elaborate \
     on each point with examples and context:";

/// Instruction used when the body is too short to stand on its own.
pub const EXPLAIN_SHORT_BODY: &str = "Provide a detailed explanation of this slide. Explain what \
     it teaches, what the key concepts mean, and how they relate to each other. Be thorough and \
     detailed:";

/// Context block for a single-slide explanation.
pub fn slide_context(title: &str, content: &str) -> String {
    format!("Title: {title}\n\nContent: {content}")
}

/// Context block for ranked retrieval: page, title, and body per slide,
/// blank-line separated.
pub fn ranked_context(slides: &[&Slide]) -> String {
    slides
        .iter()
        .map(|slide| format!("Slide {}: {}\n{}", slide.page, slide.title, slide.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

static BULLET_GLYPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[\u{2022}\u{2023}\u{25E6}\u{2043}\u{2219}]").expect("bullet glyph regex is valid")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));
static SENTENCE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.)\s+([A-Z])").expect("sentence break regex is valid"));
static DASH_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-\s+").expect("dash item regex is valid"));

/// Normalize slide text for display: bullet glyphs become dashes, runs of
/// whitespace collapse, and sentence/dash boundaries get their own lines.
pub fn clean_slide_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = BULLET_GLYPH_RE.replace_all(text, "- ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    let text = SENTENCE_BREAK_RE.replace_all(&text, "$1\n$2");
    let text = DASH_ITEM_RE.replace_all(&text, "\n- ");
    text.trim().to_string()
}
