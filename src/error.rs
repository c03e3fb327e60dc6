//! Error taxonomy for the import pipeline.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors an import run can produce.
///
/// Only `Malformed` is recovered locally: the offending record is skipped,
/// reported to the observer, and the run continues. Every other variant
/// aborts the run; batches committed before the failure remain persisted.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Invalid batch size, date, hour, or config file. Raised before any I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Network, HTTP status, or decompression failure for one hour window.
    #[error("fetch {window}: {message}")]
    Fetch { window: String, message: String },

    /// A record missing or mistyping a required field.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// Store open or write failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Observer or filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
