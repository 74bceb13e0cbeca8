use crate::models::Slide;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word regex is valid"));

fn token_set(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|token| token.as_str().to_string())
        .collect()
}

/// Score slides against a free-text query by lexical token overlap and
/// return up to `k` of them, strictly descending by score, stable with
/// respect to slide order on ties. Zero-score slides never appear; a query
/// with no overlap anywhere yields an empty result, which callers treat as
/// "no relevant slides found".
pub fn rank_slides<'a>(query: &str, slides: &'a [Slide], k: usize) -> Vec<&'a Slide> {
    let query_tokens = token_set(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &Slide)> = slides
        .iter()
        .map(|slide| {
            let tokens = token_set(&slide.content_blob());
            (query_tokens.intersection(&tokens).count(), slide)
        })
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
    scored.into_iter().take(k).map(|(_, slide)| slide).collect()
}
