//! Persisted identity record (`me.info`).
//!
//! ```text
//! line 1   client name
//! line 2   client id, 32 hex digits
//! line 3   private key, base64 of PKCS#8 DER
//! ```
//!
//! The record is written once: the name and id after the first successful
//! registration, the key after the first key exchange. Existing content is
//! never overwritten.

use crate::error::{Error, ValidationError};
use crate::identity::{ClientId, ClientIdentity, DisplayName};
use cipherpost_files::LineFile;
use std::path::{Path, PathBuf};

const NAME_LINE: usize = 1;
const ID_LINE: usize = 2;
const KEY_LINE: usize = 3;

/// Contents of an identity record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Registered identity
    pub identity: ClientIdentity,
    /// Encoded private key, once a key exchange has happened
    pub private_key: Option<String>,
}

/// Storage for the client's identity.
///
/// The session only needs these four operations, so tests and embedders
/// can keep the identity wherever they like.
pub trait IdentityStore {
    /// True if a record exists, valid or not
    fn exists(&self) -> bool;

    /// Load the record, `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClientId` if the stored id is not
    /// 32 hex digits, or a persistence error.
    fn load(&self) -> Result<Option<IdentityRecord>, Error>;

    /// Write name and id unless a record already exists. Returns whether
    /// anything was written.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the record cannot be written.
    fn save_identity(&self, identity: &ClientIdentity) -> Result<bool, Error>;

    /// Store the encoded private key unless one is already stored. Returns
    /// whether anything was written.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the record cannot be written.
    fn save_private_key(&self, encoded: &str) -> Result<bool, Error>;
}

/// Identity record kept in a line-oriented text file
#[derive(Debug, Clone)]
pub struct IdentityFile {
    file: LineFile,
}

impl IdentityFile {
    /// Use the record at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: LineFile::new(path),
        }
    }

    /// Path of the record
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl IdentityStore for IdentityFile {
    fn exists(&self) -> bool {
        self.file.exists()
    }

    fn load(&self) -> Result<Option<IdentityRecord>, Error> {
        if !self.file.exists() {
            return Ok(None);
        }
        let lines = self.file.read_lines()?;
        let line = |n: usize| lines.get(n - 1).map(|l| l.trim()).filter(|l| !l.is_empty());

        let name = line(NAME_LINE).ok_or(ValidationError::MissingField {
            field: "client name",
            record: "me.info",
        })?;
        let id_hex = line(ID_LINE).ok_or(ValidationError::MissingField {
            field: "client id",
            record: "me.info",
        })?;
        let id: ClientId = id_hex.parse()?;

        Ok(Some(IdentityRecord {
            identity: ClientIdentity::new(DisplayName::new(name), id),
            private_key: line(KEY_LINE).map(str::to_string),
        }))
    }

    fn save_identity(&self, identity: &ClientIdentity) -> Result<bool, Error> {
        if self.file.exists() {
            tracing::debug!(
                "{} already exists, leaving it unchanged",
                self.path().display()
            );
            return Ok(false);
        }
        self.file
            .write_lines(&[identity.name.as_str(), identity.id.to_hex().as_str()])?;
        tracing::info!("Saved identity {} to {}", identity.id, self.path().display());
        Ok(true)
    }

    fn save_private_key(&self, encoded: &str) -> Result<bool, Error> {
        let existing = match self.file.read_line(KEY_LINE) {
            Ok(line) => line,
            Err(cipherpost_files::FileError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        if existing.is_some_and(|l| !l.trim().is_empty()) {
            tracing::debug!("Private key already stored, leaving it unchanged");
            return Ok(false);
        }
        self.file.set_line(KEY_LINE, encoded)?;
        tracing::debug!("Saved private key to {}", self.path().display());
        Ok(true)
    }
}
