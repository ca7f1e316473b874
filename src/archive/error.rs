//! Error types for `.cubez` archive reading and writing.

use thiserror::Error;

/// Errors that can occur while encoding or decoding an archive container.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("invalid archive format: {0}")]
    InvalidFormat(String),

    #[error("archive has no dataset '{0}'")]
    MissingDataset(String),

    #[error("dataset '{name}' holds {found}, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("msgpack encode failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
