//! Citation extraction
//!
//! Heuristic extraction of sources from answer text: URLs plus
//! "according to" / "source:" / "cited from" attribution phrases.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

const MAX_CITATIONS: usize = 10;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap());

static ATTRIBUTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"according to ([^,\.]+)",
        r"source:\s*([^,\.]+)",
        r"cited from ([^,\.]+)",
    ]
    .iter()
    .map(|p| {
        RegexBuilder::new(p)
            .case_insensitive(true)
            .build()
            .unwrap()
    })
    .collect()
});

/// Extract citations from response text.
///
/// Duplicates are removed case-insensitively, order of first occurrence
/// is preserved, and the list is capped at 10 entries.
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut citations: Vec<String> = URL
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    for pattern in ATTRIBUTIONS.iter() {
        for capture in pattern.captures_iter(text) {
            if let Some(source) = capture.get(1) {
                citations.push(source.as_str().to_string());
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    citations
        .into_iter()
        .filter(|c| seen.insert(c.to_lowercase()))
        .take(MAX_CITATIONS)
        .collect()
}
