use crate::error::IngestError;
use crate::extractor::RawSlide;
use crate::models::Slide;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// A line must be longer than this (after normalization) to be counted as
/// boilerplate; shorter lines repeat too easily to be meaningful.
const BOILERPLATE_MIN_CHARS: usize = 10;

/// Number of distinct units a line must appear on to be boilerplate.
const BOILERPLATE_MIN_UNITS: usize = 3;

const ZERO_WIDTH_AND_CONTROL: &str = "[\u{200B}-\u{200D}\u{FEFF}\u{0000}-\u{001F}\u{007F}]";
const FOOTER_HEURISTICS: &str =
    r"(?i)https?://\S+|\b\S+@\S+\b|©|copyright|\b(all rights reserved)\b";

struct LineFilters {
    control: Regex,
    whitespace: Regex,
    page_number: Regex,
    slide_marker: Regex,
    footer: Regex,
}

impl LineFilters {
    fn new() -> Result<Self, IngestError> {
        Ok(Self {
            control: Regex::new(ZERO_WIDTH_AND_CONTROL)?,
            whitespace: Regex::new(r"\s+")?,
            page_number: Regex::new(r"^\d{1,3}$")?,
            slide_marker: Regex::new(r"(?i)^\s*slide\s+\d+\s*$")?,
            footer: Regex::new(FOOTER_HEURISTICS)?,
        })
    }

    /// Normalize one line and decide whether it survives: zero-width and
    /// control characters become spaces, whitespace collapses, and pure
    /// page numbers, "slide N" markers, and footer lines are dropped.
    fn clean(&self, line: &str) -> Option<String> {
        let line = self.control.replace_all(line, " ");
        let line = self.whitespace.replace_all(line.trim(), " ").into_owned();
        if line.is_empty() {
            return None;
        }
        if self.page_number.is_match(&line) || self.slide_marker.is_match(&line) {
            return None;
        }
        if self.footer.is_match(&line) {
            return None;
        }
        Some(line)
    }

    fn normalize_key(&self, line: &str) -> String {
        self.whitespace
            .replace_all(line.trim(), " ")
            .to_lowercase()
    }
}

/// Split extracted units into titled slides.
///
/// Lines are cleaned per unit, running boilerplate (normalized lines longer
/// than [`BOILERPLATE_MIN_CHARS`] appearing on at least
/// [`BOILERPLATE_MIN_UNITS`] units) is removed everywhere, then the first
/// surviving line becomes the title and the rest the body. Pages are
/// 1-based in source order regardless of filtering; a unit left with no
/// lines becomes a title-only slide rather than an error.
pub fn segment(raw_slides: &[RawSlide]) -> Result<Vec<Slide>, IngestError> {
    let filters = LineFilters::new()?;

    let cleaned: Vec<Vec<String>> = raw_slides
        .iter()
        .map(|unit| {
            unit.lines
                .iter()
                .filter_map(|line| filters.clean(line))
                .collect()
        })
        .collect();

    let common = boilerplate_lines(&filters, &cleaned);

    let slides = cleaned
        .into_iter()
        .enumerate()
        .map(|(index, lines)| {
            let page = (index + 1) as u32;
            let kept: Vec<String> = lines
                .into_iter()
                .filter(|line| !common.contains(&filters.normalize_key(line)))
                .collect();

            let title = kept
                .first()
                .cloned()
                .unwrap_or_default();
            let text = if kept.len() > 1 {
                kept[1..].join("\n").trim().to_string()
            } else {
                String::new()
            };

            Slide {
                page,
                title: if title.is_empty() {
                    format!("Slide {page}")
                } else {
                    title
                },
                text,
                bullets: Vec::new(),
            }
        })
        .collect();

    Ok(slides)
}

/// Normalized lines recurring on at least [`BOILERPLATE_MIN_UNITS`] distinct
/// units. Derived per document, used only during extraction.
fn boilerplate_lines(filters: &LineFilters, units: &[Vec<String>]) -> HashSet<String> {
    let mut unit_counts: HashMap<String, usize> = HashMap::new();

    for lines in units {
        let mut seen_in_unit = HashSet::new();
        for line in lines {
            let key = filters.normalize_key(line);
            if key.chars().count() <= BOILERPLATE_MIN_CHARS {
                continue;
            }
            if seen_in_unit.insert(key.clone()) {
                *unit_counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    unit_counts
        .into_iter()
        .filter(|(_, count)| *count >= BOILERPLATE_MIN_UNITS)
        .map(|(key, _)| key)
        .collect()
}
