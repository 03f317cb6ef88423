//! Student ID scanner.
//!
//! Finds the first `TUPM-NN-NNNN` token on a line (case-insensitive, not
//! anchored) and splits the line into the ID and everything after it.
//! Text before the ID is never part of the remainder.

use std::sync::LazyLock;

use regex::Regex;

/// Matches a student number followed by the rest of the line.
static STUDENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(TUPM-[0-9]{2}-[0-9]{4})(.*)$").expect("student id regex")
});

/// A student ID located on a roster line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMatch<'a> {
    /// The matched ID, trimmed, in the case it appeared in the document.
    pub student_id: &'a str,
    /// Raw text following the ID, untrimmed.
    pub remainder: &'a str,
}

/// Scan a single line for a student ID.
pub fn scan_line(line: &str) -> Option<IdMatch<'_>> {
    let caps = STUDENT_ID_RE.captures(line)?;
    let id = caps.get(1)?;
    let rest = caps.get(2).map_or("", |m| m.as_str());

    Some(IdMatch {
        student_id: id.as_str().trim(),
        remainder: rest,
    })
}
