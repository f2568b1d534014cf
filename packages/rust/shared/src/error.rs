//! Error types for snipbook.
//!
//! Library crates use [`SnipbookError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Recoverable, per-entry problems are not errors at this level: they are
//! collected as [`Diagnostic`](crate::Diagnostic) values on the book.

use std::path::PathBuf;

/// Top-level error type for all snipbook operations.
#[derive(Debug, thiserror::Error)]
pub enum SnipbookError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad output path, serialization failure, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The book produced no snippets after a full traversal.
    #[error("book at {root:?} has no usable content")]
    EmptyBook { root: PathBuf },

    /// More malformed entries than the configured tolerance.
    #[error("{count} malformed entries exceed the tolerance of {limit}")]
    TooManyMalformed { count: usize, limit: usize },

    /// The run was cancelled before the book was complete.
    #[error("generation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SnipbookError>;

impl SnipbookError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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
