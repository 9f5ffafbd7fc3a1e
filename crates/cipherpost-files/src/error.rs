//! Error types for local file handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing local files
#[derive(Debug, Error)]
pub enum FileError {
    /// File does not exist
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading failed
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing failed
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// File being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Line numbers start at 1
    #[error("invalid line number: {0}")]
    InvalidLine(usize),

    /// Path does not end in a file name
    #[error("path has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    /// File exceeds what a single upload can carry
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge {
        /// Actual size
        size: u64,
        /// Maximum supported size
        max: u64,
    },
}

impl FileError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Read { path, source }
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
