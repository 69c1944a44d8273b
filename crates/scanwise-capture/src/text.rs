//! Cleanup of raw recognizer output into an ingredient list.

use crate::error::{CaptureError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*ingredients?\s*[:\-]\s*").expect("label regex is hardcoded and valid")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is hardcoded and valid"));

/// Turn multi-line recognizer output into a single-line ingredient list.
///
/// Lines are trimmed, blank lines dropped, and the rest joined with single
/// spaces. A leading `Ingredients:` label is removed.
///
/// # Errors
/// Returns [`CaptureError::Recognition`] if nothing but whitespace remains.
pub fn normalize_extracted_text(raw: &str) -> Result<String> {
    let joined = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let stripped = LABEL_PREFIX.replace(&joined, "");
    let collapsed = WHITESPACE_RUN.replace_all(stripped.trim(), " ");

    if collapsed.is_empty() {
        return Err(CaptureError::Recognition("no text recognized".to_string()));
    }
    Ok(collapsed.into_owned())
}
