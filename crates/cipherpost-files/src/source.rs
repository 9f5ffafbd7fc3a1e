//! Upload source loading.
//!
//! The whole file is read into memory: the upload is encrypted as one CBC
//! message and its size travels in a 32-bit field.

use crate::MAX_CONTENT_SIZE;
use crate::error::FileError;
use std::fs;
use std::path::{Path, PathBuf};

/// A file loaded for upload
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    content: Vec<u8>,
}

impl SourceFile {
    /// Load a file's plaintext
    ///
    /// # Errors
    ///
    /// Returns `FileError::NotFound` if the path does not exist,
    /// `FileError::NoFileName` if it has no final component,
    /// `FileError::TooLarge` if it cannot fit in one upload, or
    /// `FileError::Read` on other I/O failures.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let name = file_name(path)?;

        let size = fs::metadata(path)
            .map_err(|e| FileError::read(path, e))?
            .len();
        if size > MAX_CONTENT_SIZE {
            return Err(FileError::TooLarge {
                size,
                max: MAX_CONTENT_SIZE,
            });
        }

        let content = fs::read(path).map_err(|e| FileError::read(path, e))?;
        tracing::debug!("Loaded {} ({} bytes)", path.display(), content.len());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            content,
        })
    }

    /// Path the file was loaded from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, as sent to the server
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plaintext content
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// True for an empty file
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Final component of `path` as a string
///
/// # Errors
///
/// Returns `FileError::NoFileName` if the path ends in `..` or is a root.
pub fn file_name(path: &Path) -> Result<String, FileError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| FileError::NoFileName(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Report.TXT");
        fs::write(&path, b"quarterly numbers").unwrap();

        let source = SourceFile::load(&path).unwrap();
        assert_eq!(source.name(), "Report.TXT");
        assert_eq!(source.content(), b"quarterly numbers");
        assert_eq!(source.len(), 17);
        assert_eq!(source.path(), path.as_path());
    }

    #[test]
    fn test_load_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").unwrap();

        let source = SourceFile::load(&path).unwrap();
        assert!(source.is_empty());
    }

    #[test]
    fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let err = SourceFile::load(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
    }

    #[test]
    fn test_file_name_rejects_parent() {
        assert!(matches!(
            file_name(Path::new("/tmp/..")),
            Err(FileError::NoFileName(_))
        ));
        assert_eq!(file_name(Path::new("a/b/c.txt")).unwrap(), "c.txt");
    }
}
