use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading exports, writing the catalog or staging audio.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A numeric column held something that is not an integer
    #[error("Field '{field}' is not an integer: {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    /// A row had too few or too many columns
    #[error("Row {line} of {path} has {found} fields, expected 6 or 7")]
    FieldCount {
        path: PathBuf,
        line: u64,
        found: usize,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tags could not be read from an audio file
    #[error("Failed to read tags from {path}: {message}")]
    Tags { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
