//! Cleanup passes applied to the text that follows a student ID.
//!
//! Each pass is a function `&str -> &str` (or a predicate for the final gate),
//! applied in sequence by [`crate::RosterParser`]:
//! trim, strip leading numbering, cut at the program code, trim, length gate.

use std::sync::LazyLock;

use masterlist_shared::{MasterlistError, Result};
use regex::Regex;

// ---------------------------------------------------------------------------
// Program codes
// ---------------------------------------------------------------------------

/// The set of program codes that mark the end of a student's name.
///
/// Codes match case-insensitively anywhere in the text, including glued to
/// the name (`"Dela Cruz, JuanBSCS-4B"`). There are no word boundaries, so a
/// code inside a longer word also cuts the name there.
#[derive(Debug, Clone)]
pub struct ProgramCodes {
    pattern: Regex,
}

impl ProgramCodes {
    /// Build the set from a list of codes. Empty or blank codes are rejected.
    pub fn new<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes
            .into_iter()
            .map(|c| c.into().trim().to_string())
            .collect();

        if codes.is_empty() {
            return Err(MasterlistError::validation(
                "at least one program code is required",
            ));
        }
        if codes.iter().any(String::is_empty) {
            return Err(MasterlistError::validation("program codes must not be blank"));
        }

        let alternation = codes
            .iter()
            .map(|c| regex::escape(c))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("(?i)(?:{alternation})"))
            .map_err(|e| MasterlistError::validation(format!("invalid program codes: {e}")))?;

        Ok(Self { pattern })
    }

    /// Byte offset of the leftmost program code in `text`, if any.
    pub fn find(&self, text: &str) -> Option<usize> {
        self.pattern.find(text).map(|m| m.start())
    }
}

// ---------------------------------------------------------------------------
// Pass 1: Trim
// ---------------------------------------------------------------------------

/// Strip surrounding whitespace (including a stray `\r` from CRLF text).
///
/// Uses Unicode `White_Space`, so a byte-order mark (U+FEFF) is not
/// whitespace and survives the trim. A BOM glued to a name therefore counts
/// toward the length gate and stays in the stored name.
pub fn trim_remainder(text: &str) -> &str {
    text.trim()
}

// ---------------------------------------------------------------------------
// Pass 2: Strip leading numbering
// ---------------------------------------------------------------------------

/// Remove a leading row number such as `"12."`.
///
/// Only digits immediately followed by a period count; `"12 Santos"` is left
/// alone.
pub fn strip_numbering(text: &str) -> &str {
    static NUMBERING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[0-9]+\.").expect("valid regex"));

    match NUMBERING_RE.find(text) {
        Some(m) => text[m.end()..].trim(),
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Pass 3: Truncate at program code
// ---------------------------------------------------------------------------

/// Drop the first program code and everything after it.
pub fn truncate_program_code<'a>(text: &'a str, codes: &ProgramCodes) -> &'a str {
    match codes.find(text) {
        Some(start) => text[..start].trim(),
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Pass 4: Validity gate
// ---------------------------------------------------------------------------

/// True when the cleaned name is long enough to be a real name.
///
/// Length is in `char`s, not UTF-16 code units.
pub fn passes_length_gate(name: &str, min_len: usize) -> bool {
    name.chars().count() >= min_len
}
