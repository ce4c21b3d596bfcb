//! Keyword relevance scoring for environmental news.
//!
//! Keywords match whole words only, with an optional plural `s`. Entries
//! ending in `*` are stems and match any word that starts with them.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_SCORE: u8 = 100;
pub const DEFAULT_MIN_SCORE: u8 = 20;

const HIGH_PRIORITY_POINTS: u32 = 15;
const KEYWORD_POINTS: u32 = 10;
const TITLE_WEIGHT: u32 = 2;

const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "waste",
    "litter",
    "trash",
    "garbage",
    "recycl*",
    "plogging",
    "pollution",
    "sampah",
    "daur ulang",
    "limbah",
    "polusi",
    "pencemaran",
];

const KEYWORDS: &[&str] = &[
    "plastic",
    "environment",
    "climate",
    "ocean",
    "river",
    "beach",
    "cleanup",
    "clean-up",
    "sustainab*",
    "compost",
    "landfill",
    "emission",
    "biodegradable",
    "microplastic",
    "plastik",
    "lingkungan",
    "iklim",
    "lautan",
    "sungai",
    "pantai",
    "hutan",
    "emisi",
    "kompos",
    "bersih-bersih",
];

static HIGH_PRIORITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| compile(HIGH_PRIORITY_KEYWORDS));
static KEYWORD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| compile(KEYWORDS));

fn compile(keywords: &[&str]) -> Vec<Regex> {
    keywords
        .iter()
        .map(|keyword| {
            let pattern = match keyword.strip_suffix('*') {
                Some(stem) => format!(r"(?i)\b{}\w*", regex::escape(stem)),
                None => format!(r"(?i)\b{}s?\b", regex::escape(keyword)),
            };
            Regex::new(&pattern).expect("relevance keyword pattern")
        })
        .collect()
}

/// Scores `title` and `description` against the keyword lists. Title hits
/// count double. The result never exceeds [`MAX_SCORE`].
pub fn score(title: &str, description: Option<&str>) -> u8 {
    let body = description.unwrap_or_default();

    let weighted = |patterns: &[Regex], points: u32| -> u32 {
        patterns
            .iter()
            .map(|pattern| {
                let hits = occurrences(pattern, title) * TITLE_WEIGHT + occurrences(pattern, body);
                hits * points
            })
            .sum()
    };

    let total = weighted(&HIGH_PRIORITY_PATTERNS, HIGH_PRIORITY_POINTS) + weighted(&KEYWORD_PATTERNS, KEYWORD_POINTS);
    total.min(MAX_SCORE as u32) as u8
}

fn occurrences(pattern: &Regex, haystack: &str) -> u32 {
    pattern.find_iter(haystack).count() as u32
}
