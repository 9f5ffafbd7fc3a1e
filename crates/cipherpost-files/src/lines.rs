//! Line-oriented text records.
//!
//! Both local records the client keeps (`transfer.info` and `me.info`) are
//! plain text with one field per line. Lines are addressed from 1, trailing
//! `\r` is dropped on read, and writes always leave the file ending in `\n`.

use crate::error::FileError;
use std::fs;
use std::path::{Path, PathBuf};

/// A text file addressed by 1-indexed line number
#[derive(Debug, Clone)]
pub struct LineFile {
    path: PathBuf,
}

impl LineFile {
    /// Wrap a path; nothing is touched on disk
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the file exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read every line
    ///
    /// # Errors
    ///
    /// Returns `FileError::NotFound` if the file is absent, or
    /// `FileError::Read` on any other I/O failure.
    pub fn read_lines(&self) -> Result<Vec<String>, FileError> {
        let text = fs::read_to_string(&self.path).map_err(|e| FileError::read(&self.path, e))?;
        Ok(text
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect())
    }

    /// Read line `n` (1-indexed), `None` if the file is shorter
    ///
    /// # Errors
    ///
    /// Returns `FileError::InvalidLine` for `n == 0`, and the errors of
    /// [`read_lines`](Self::read_lines).
    pub fn read_line(&self, n: usize) -> Result<Option<String>, FileError> {
        let index = n.checked_sub(1).ok_or(FileError::InvalidLine(n))?;
        Ok(self.read_lines()?.into_iter().nth(index))
    }

    /// Replace the whole file with `lines`
    ///
    /// # Errors
    ///
    /// Returns `FileError::Write` if the file cannot be written.
    pub fn write_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<(), FileError> {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        fs::write(&self.path, text).map_err(|e| FileError::write(&self.path, e))
    }

    /// Set line `n` (1-indexed), padding with empty lines if the file is
    /// shorter
    ///
    /// # Errors
    ///
    /// Returns `FileError::InvalidLine` for `n == 0`, or an I/O error.
    pub fn set_line(&self, n: usize, line: &str) -> Result<(), FileError> {
        let index = n.checked_sub(1).ok_or(FileError::InvalidLine(n))?;
        let mut lines = self.existing_lines()?;
        if lines.len() <= index {
            lines.resize(index + 1, String::new());
        }
        lines[index] = line.to_string();
        self.write_lines(&lines)
    }

    fn existing_lines(&self) -> Result<Vec<String>, FileError> {
        match self.read_lines() {
            Ok(lines) => Ok(lines),
            Err(FileError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
