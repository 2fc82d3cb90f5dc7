//! Splits a free-form AI summary into insight cards.
//!
//! The backend returns whatever the model wrote: numbered lists, bullet
//! glyphs, dash-prefixed lines or plain paragraphs, sometimes mixed. The
//! patterns below are tried in priority order and the first one that breaks
//! the text into more than one piece wins. It is a display heuristic, not a
//! parser.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pieces this short after cleanup are treated as parsing noise.
pub const MIN_POINT_CHARS: usize = 10;

static DELIMITERS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        // "1. ", "12. "
        Regex::new(r"\d+\.\s+").expect("numbered list pattern"),
        Regex::new(r"•\s+").expect("bullet pattern"),
        Regex::new(r"-\s+").expect("dash pattern"),
        Regex::new(r"\n\n").expect("paragraph pattern"),
    ]
});

/// Segment `text` into ordered, display-ready insight points.
///
/// Every returned point is trimmed, has its whitespace runs collapsed to a
/// single space and is longer than [`MIN_POINT_CHARS`] characters.
pub fn segment(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut points = vec![text];
    for pattern in DELIMITERS.iter() {
        let split: Vec<&str> = points
            .iter()
            .flat_map(|point| pattern.split(point))
            .filter(|piece| !piece.trim().is_empty())
            .collect();

        if split.len() > 1 {
            points = split;
            break;
        }
    }

    points
        .into_iter()
        .map(collapse_whitespace)
        .filter(|point| point.chars().count() > MIN_POINT_CHARS)
        .collect()
}

/// [`segment`] for summaries that may not exist yet.
pub fn segment_opt(text: Option<&str>) -> Vec<String> {
    text.map(segment).unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
