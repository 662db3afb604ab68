//! Quote and whitespace normalization.
//!
//! Quotations are matched against source text, so both sides are folded
//! to straight ASCII quotes and single spaces. Every function here is
//! idempotent.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Replacement table for curly quotes and quote entities.
const QUOTE_FOLDS: &[(&str, &str)] = &[
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
    ("\u{201e}", "\""),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("\u{201a}", "'"),
    ("&ldquo;", "\""),
    ("&rdquo;", "\""),
    ("&quot;", "\""),
    ("&#34;", "\""),
    ("&lsquo;", "'"),
    ("&rsquo;", "'"),
    ("&apos;", "'"),
    ("&#39;", "'"),
    ("\u{a0}", " "),
];

/// Fold curly quotes, apostrophes and their HTML entities to `"` and `'`.
pub fn convert_quotes_to_straight(text: &str) -> String {
    QUOTE_FOLDS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| {
            if acc.contains(from) {
                acc.replace(from, to)
            } else {
                acc
            }
        })
}

/// Collapse whitespace runs (including `&nbsp;`) into single spaces and
/// trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("&nbsp;", " ").replace('\u{a0}', " ");
    WHITESPACE_RUN
        .replace_all(text.trim(), " ")
        .into_owned()
}

/// Quote folding followed by whitespace normalization.
pub fn normalize_text(text: &str) -> String {
    normalize_whitespace(&convert_quotes_to_straight(text))
}
