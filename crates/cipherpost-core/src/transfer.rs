//! Upload unit.

use crate::error::{Error, ValidationError};
use crate::identity::ClientId;
use crate::wire::{FileHeader, encode_name};
use crate::{FILE_HEADER_SIZE, NAME_SIZE};
use cipherpost_crypto::TransferKey;
use cipherpost_files::{SourceFile, cksum};

/// One encrypted file ready to send.
///
/// The checksum is always taken over the plaintext, before encryption,
/// because the server digests what it decrypts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    client_id: ClientId,
    filename: String,
    content: Vec<u8>,
    checksum: u32,
}

impl TransferItem {
    /// Checksum and encrypt a loaded source file
    #[must_use]
    pub fn prepare(client_id: ClientId, source: &SourceFile, key: &TransferKey) -> Self {
        let checksum = cksum(source.content());
        let content = key.encrypt(source.content());
        tracing::debug!(
            "Prepared {}: {} plaintext bytes, {} encrypted, cksum {}",
            source.name(),
            source.len(),
            content.len(),
            checksum
        );
        Self {
            client_id,
            filename: source.name().to_string(),
            content,
            checksum,
        }
    }

    /// Uploader id
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Filename as sent
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Encrypted content
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// `cksum` of the plaintext
    #[must_use]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Encrypted content size for the file header
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ContentTooLarge` past 4 GiB.
    pub fn content_size(&self) -> Result<u32, ValidationError> {
        u32::try_from(self.content.len())
            .map_err(|_| ValidationError::ContentTooLarge(self.content.len()))
    }

    /// File header for this item
    ///
    /// # Errors
    ///
    /// See [`content_size`](Self::content_size).
    pub fn header(&self) -> Result<FileHeader, ValidationError> {
        Ok(FileHeader {
            client_id: self.client_id,
            content_size: self.content_size()?,
        })
    }

    /// Encode header, filename block and content
    ///
    /// # Errors
    ///
    /// See [`content_size`](Self::content_size).
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let header = self.header()?;
        let mut buf = Vec::with_capacity(FILE_HEADER_SIZE + NAME_SIZE + self.content.len());
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&encode_name(&self.filename));
        buf.extend_from_slice(&self.content);
        Ok(buf)
    }
}
