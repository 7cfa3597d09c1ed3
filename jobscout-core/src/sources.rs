//! Parsing and seeding of the newline-separated source input.

use std::collections::HashSet;

/// Splits free text into source URLs: one per line, trimmed, empties dropped.
pub fn parse_source_urls(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Merges server suggestions into the pending input as an ordered set:
/// suggestions first, then the existing lines, first occurrence wins.
pub fn merge_suggestions(suggested: &[String], pending: &str) -> String {
    let mut seen = HashSet::new();
    suggested
        .iter()
        .map(String::as_str)
        .chain(pending.lines().map(str::trim))
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .collect::<Vec<_>>()
        .join("\n")
}
