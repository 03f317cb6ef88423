//! Error types for the masterlist pipeline.
//!
//! Library crates use [`MasterlistError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all masterlist operations.
#[derive(Debug, thiserror::Error)]
pub enum MasterlistError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The uploaded object could not be retrieved from its bucket.
    #[error("fetch error for {path}: {message}")]
    Fetch { path: String, message: String },

    /// PDF text extraction failed (corrupt or unsupported document).
    #[error("extraction error: {0}")]
    Extraction(String),

    /// An upload event payload could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input (object key, program code list, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MasterlistError>;

impl MasterlistError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error for the given object path.
    pub fn fetch(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
