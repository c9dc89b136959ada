//! Structured errors for GFA parsing and index construction.
//!
//! Parsing diagnostics identify the record kind, the 1-based line number,
//! and the violated field, so a single error line is enough to locate the
//! problem in the input file.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, GfaError>;

/// Everything that can go wrong between opening a GFA file and finishing
/// the index.
#[derive(Debug)]
pub enum GfaError {
    /// The file cannot be opened, stat'ed, or memory-mapped.
    Open { path: PathBuf, source: io::Error },
    /// A recognized record lacks a required field, has an empty required
    /// field, or ends before a required field.
    Structure {
        record: char,
        line: usize,
        what: String,
    },
    /// A required field exists but is malformed.
    Shape {
        record: char,
        line: usize,
        what: String,
    },
    /// A P-line or W-line with zero segments.
    EmptyCollection { record: char, line: usize },
    /// The file as a whole lacks segments, or lacks both paths and walks.
    Content(String),
    /// Path metadata could not be derived from path names or walk fields.
    Metadata(String),
    /// A path or walk references a segment with no node translation.
    Reference(String),
}

impl fmt::Display for GfaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfaError::Open { path, source } => {
                write!(f, "cannot open GFA file '{}': {}", path.display(), source)
            }
            GfaError::Structure { record, line, what } => {
                write!(f, "{}-line {} {}", record, line, what)
            }
            GfaError::Shape { record, line, what } => {
                write!(f, "{}-line {}: {}", record, line, what)
            }
            GfaError::EmptyCollection { record, line } => {
                let kind = if *record == 'W' { "walk" } else { "path" };
                write!(f, "the {} on line {} is empty", kind, line)
            }
            GfaError::Content(msg) => write!(f, "{}", msg),
            GfaError::Metadata(msg) => write!(f, "{}", msg),
            GfaError::Reference(name) => {
                write!(f, "path or walk references unknown segment '{}'", name)
            }
        }
    }
}

impl Error for GfaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GfaError::Open { source, .. } => Some(source),
            _ => None,
        }
    }
}
