//! Pattern-based PII redaction
//!
//! Scrubs recognizable sensitive substrings (emails, phone numbers, SSNs,
//! payment card numbers, API keys) from free text, replacing each match with
//! a placeholder naming its category. Matching is purely textual: overlapping
//! or malformed patterns are a known limitation of this approach, not
//! something to paper over with semantic detection.

use once_cell::sync::Lazy;
use regex::Regex;

/// Named pattern categories, applied in this fixed order
///
/// Each category scans the output of the previous one, so placeholders
/// inserted earlier are never re-matched (none of the patterns match the
/// placeholder alphabet).
static PII_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "EMAIL",
            Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
        ),
        ("PHONE", Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap()),
        ("SSN", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap()),
        (
            "CREDITCARD",
            Regex::new(r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b").unwrap(),
        ),
        (
            "APIKEY",
            Regex::new(r#"(?i)api[_-]?key[_:=\s]+['"]?[a-zA-Z0-9_-]{20,}['"]?"#).unwrap(),
        ),
    ]
});

/// Result of one redaction pass over a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Redaction {
    /// Input with every match replaced by its category placeholder
    pub masked: String,

    /// Total number of matches across all categories
    pub redacted_count: i64,
}

/// Mask all recognized PII categories in `text`
///
/// Pure function with no knowledge of the record the text belongs to; the
/// caller invokes it independently for prompt and response and sums the
/// counts.
pub fn redact(text: &str) -> Redaction {
    let mut masked = text.to_string();
    let mut redacted_count = 0i64;

    for (category, pattern) in PII_PATTERNS.iter() {
        let matches = pattern.find_iter(&masked).count() as i64;
        if matches == 0 {
            continue;
        }
        redacted_count += matches;
        let placeholder = format!("[{}_REDACTED]", category);
        masked = pattern.replace_all(&masked, placeholder.as_str()).into_owned();
    }

    Redaction {
        masked,
        redacted_count,
    }
}
