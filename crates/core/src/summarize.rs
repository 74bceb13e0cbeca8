use crate::error::GenerateError;
use crate::generate::SummaryConstraints;
use crate::models::SummaryOptions;
use crate::traits::Generate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Sole bullet returned for a slide with no readable text.
pub const NO_TEXT_SENTINEL: &str = "No readable text found on this slide.";

/// Inputs under this many words are returned as-is: too short to compress.
const PASSTHROUGH_WORDS: usize = 25;

const TARGET_WORDS_FLOOR: usize = 40;
const TARGET_WORDS_CEIL: usize = 220;

/// Rough token estimate per word; the generation budget never exceeds 90%
/// of the estimated input length.
const TOKENS_PER_WORD: f32 = 1.3;

/// Sentences shorter than this many words are discarded as fragments.
const MIN_BULLET_WORDS: usize = 6;

static CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[\u{200B}-\u{200D}\u{FEFF}\u{0000}-\u{001F}\u{007F}]")
        .expect("control-character regex is valid")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

pub fn normalize_text(text: &str) -> String {
    let text = CONTROL_RE.replace_all(text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace())
        {
            sentences.push(current.trim().to_string());
            current.clear();
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences.retain(|sentence| !sentence.is_empty());
    sentences
}

/// Turn generated prose into bullets: sentence split, bullet-glyph strip,
/// fragment drop, case-insensitive dedupe preserving first-seen order,
/// capped at `max_items`. May return nothing; the caller decides fallback.
fn to_bullets(text: &str, max_items: usize) -> Vec<String> {
    let mut bullets = Vec::new();
    let mut seen = HashSet::new();

    for sentence in split_sentences(text) {
        let sentence = sentence
            .trim_matches(|c: char| matches!(c, '•' | '-' | '—' | '–' | '·' | ' ' | '\t'))
            .to_string();
        if sentence.split_whitespace().count() < MIN_BULLET_WORDS {
            continue;
        }
        if !seen.insert(sentence.to_lowercase()) {
            continue;
        }
        bullets.push(sentence);
        if bullets.len() >= max_items {
            break;
        }
    }

    bullets
}

fn constraints_for(words: usize, target_ratio: f32) -> SummaryConstraints {
    let input_tokens = (words as f32 * TOKENS_PER_WORD) as usize;
    let target_words =
        ((words as f32 * target_ratio) as usize).clamp(TARGET_WORDS_FLOOR, TARGET_WORDS_CEIL);
    let approx_max_tokens = (target_words as f32 * TOKENS_PER_WORD) as usize;

    let max_len = approx_max_tokens
        .max(30)
        .min((input_tokens as f32 * 0.9) as usize);
    let mut min_len = 20.max(max_len * 3 / 4);
    if min_len >= max_len {
        min_len = 12.max(max_len * 3 / 5);
    }

    SummaryConstraints {
        max_len,
        min_len,
        no_repeat_ngram: 3,
        num_beams: 4,
    }
}

/// Reduce one slide's body text to a bounded bullet list.
///
/// Short inputs pass through as a single bullet; empty input yields the
/// [`NO_TEXT_SENTINEL`]. When the generated summary produces no usable
/// bullets, the full normalized text is returned as one bullet instead.
pub async fn summarize_slide<G>(
    generator: &G,
    text: &str,
    options: &SummaryOptions,
) -> Result<Vec<String>, GenerateError>
where
    G: Generate + ?Sized,
{
    let text = normalize_text(text);
    if text.is_empty() {
        return Ok(vec![NO_TEXT_SENTINEL.to_string()]);
    }

    let words = text.split_whitespace().count();
    if words < PASSTHROUGH_WORDS {
        return Ok(vec![text]);
    }

    let constraints = constraints_for(words, options.target_ratio);
    let summary = generator.summarize(&text, &constraints).await?;

    let bullets = to_bullets(summary.trim(), options.max_bullets);
    if bullets.is_empty() {
        return Ok(vec![text]);
    }
    Ok(bullets)
}
