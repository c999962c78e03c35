//! Error types for the crate.

use thiserror::Error;

use crate::dex::HeaderError;

/// Errors that can occur when reading dex files out of a zip container.
#[derive(Debug, Error)]
pub enum Error {
    /// The source was readable but is not a zip archive.
    ///
    /// Only parse failures land here. A source that cannot be opened at all
    /// (missing file, permission denied, an HTTP error or a server without
    /// Range support) is reported as [`Error::Io`] instead, carrying the
    /// underlying error. Callers that treat both as "not a zip file" can use
    /// [`ZipDexContainer::is_zip_file`](crate::ZipDexContainer::is_zip_file),
    /// which returns `false` for either.
    #[error("not a zip archive: {0}")]
    NotAnArchive(String),

    /// I/O error, including truncated data and CRC mismatches.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A specifically requested entry exists but is not a usable dex file.
    #[error("entry {entry} is not a dex file: {reason}")]
    NotADexFile { entry: String, reason: HeaderError },

    /// The entry is stored in a way this reader cannot decode.
    #[error("unsupported entry {entry}: {reason}")]
    UnsupportedEntry { entry: String, reason: String },

    /// The declared entry size exceeds the configured limit.
    #[error("entry {entry} is {size} bytes, exceeds limit of {limit}")]
    EntryTooLarge { entry: String, size: u64, limit: u64 },
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Io(crate::io::into_io_error(err))
    }
}

impl Error {
    /// Whether this error means the source is not a zip at all.
    pub fn is_not_an_archive(&self) -> bool {
        matches!(self, Error::NotAnArchive(_))
    }
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;
