//! Roster parsing: raw masterlist text → student records.
//!
//! Each line is handled on its own. The [`scanner`] finds the student ID,
//! then the [`cleanup`] passes turn the text after it into a name:
//!
//! 1. trim
//! 2. strip a leading row number (`"1."`)
//! 3. cut at the first program code (`BSCS`, `BSIT`, ...)
//! 4. drop names shorter than the configured minimum
//!
//! Lines without an ID (headers, footers, page numbers) contribute nothing.
//! When an ID repeats, the later line wins.
//!
//! Whitespace is Unicode `White_Space`, which leaves a byte-order mark
//! (U+FEFF) in place, and name length is counted in `char`s, so a name
//! outside the Basic Multilingual Plane is shorter here than its UTF-16
//! length.

pub mod cleanup;
pub mod scanner;

use chrono::{DateTime, Utc};
use masterlist_shared::{ParserConfig, Result, StudentMap, StudentRecord};
use tracing::trace;

pub use cleanup::ProgramCodes;
pub use scanner::{IdMatch, scan_line};

/// What a single roster line turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome<'a> {
    /// No student ID on the line.
    NoId,
    /// An ID was found but the cleaned name failed the length gate.
    Noise { student_id: &'a str },
    /// A usable student entry.
    Student { student_id: &'a str, name: &'a str },
}

/// Counters for one parse, used for logging the extraction yield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Lines in the document.
    pub lines: usize,
    /// Lines carrying a student ID.
    pub id_lines: usize,
    /// ID lines dropped by the length gate.
    pub dropped: usize,
    /// Student lines that replaced an earlier line with the same ID.
    pub duplicates: usize,
}

/// Result of parsing a full document.
#[derive(Debug, Clone, Default)]
pub struct ParsedRoster {
    /// Students keyed by ID.
    pub students: StudentMap,
    /// Parse counters.
    pub stats: ParseStats,
}

impl ParsedRoster {
    /// Number of distinct students found.
    pub fn yield_count(&self) -> usize {
        self.students.len()
    }
}

/// Line-oriented roster parser.
#[derive(Debug, Clone)]
pub struct RosterParser {
    codes: ProgramCodes,
    min_name_len: usize,
}

impl RosterParser {
    /// Build a parser from runtime config.
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            codes: ProgramCodes::new(config.program_codes.iter().cloned())?,
            min_name_len: config.min_name_len,
        })
    }

    /// Classify one line.
    pub fn parse_line<'a>(&self, line: &'a str) -> LineOutcome<'a> {
        let Some(found) = scan_line(line) else {
            return LineOutcome::NoId;
        };

        let name = cleanup::trim_remainder(found.remainder);
        let name = cleanup::strip_numbering(name);
        let name = cleanup::truncate_program_code(name, &self.codes);
        let name = cleanup::trim_remainder(name);

        if !cleanup::passes_length_gate(name, self.min_name_len) {
            return LineOutcome::Noise {
                student_id: found.student_id,
            };
        }

        LineOutcome::Student {
            student_id: found.student_id,
            name,
        }
    }

    /// Parse newline-delimited document text. Every record gets `added_at`.
    pub fn parse(&self, text: &str, added_at: DateTime<Utc>) -> ParsedRoster {
        let mut roster = ParsedRoster::default();

        for line in text.split('\n') {
            roster.stats.lines += 1;

            match self.parse_line(line) {
                LineOutcome::NoId => {}
                LineOutcome::Noise { student_id } => {
                    roster.stats.id_lines += 1;
                    roster.stats.dropped += 1;
                    trace!(student_id, "name too short after cleanup, dropping line");
                }
                LineOutcome::Student { student_id, name } => {
                    roster.stats.id_lines += 1;
                    let record = StudentRecord {
                        student_id: student_id.to_string(),
                        name: name.to_string(),
                        added_at,
                    };
                    if roster
                        .students
                        .insert(student_id.to_string(), record)
                        .is_some()
                    {
                        roster.stats.duplicates += 1;
                    }
                }
            }
        }

        roster
    }
}
