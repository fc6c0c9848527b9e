//! Error type shared by every module of the core crate.

use thiserror::Error;

/// Errors produced by the WatchSkip core.
#[derive(Debug, Error)]
pub enum Error {
    /// The input does not contain a recognizable YouTube video ID.
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    /// A string that should be an 11-character video ID is not one.
    #[error("invalid video id: {0:?}")]
    InvalidVideoId(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Dataset content violates the expected layout.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// A training or search parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Model file header is wrong or its payload is corrupt.
    #[error("model format error: {0}")]
    Format(String),
}

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Self::Format(err.to_string())
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
