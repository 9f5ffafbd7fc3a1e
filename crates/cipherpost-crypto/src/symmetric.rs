//! AES-128-CBC encryption of file content.
//!
//! The server decrypts uploads with an all-zero IV and PKCS#7 padding,
//! so the client must encrypt the same way. Every key is used for a single
//! session.

use crate::error::CryptoError;
use crate::random::random_16;
use crate::{BLOCK_SIZE, TRANSFER_KEY_SIZE};
use aes::Aes128;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::ZeroizeOnDrop;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

const ZERO_IV: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// Symmetric key for one upload session (16 bytes).
///
/// Key is zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct TransferKey([u8; TRANSFER_KEY_SIZE]);

impl TransferKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; TRANSFER_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from slice.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` if slice length is not 16 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        if slice.len() != TRANSFER_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: TRANSFER_KEY_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; TRANSFER_KEY_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Generate a random key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::RandomFailed` if the OS CSPRNG fails.
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self(random_16()?))
    }

    /// Get raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; TRANSFER_KEY_SIZE] {
        &self.0
    }

    /// Encrypt plaintext. Output length is the next multiple of 16 above
    /// `plaintext.len()`.
    #[must_use]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Aes128CbcEnc::new(&self.0.into(), &ZERO_IV.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Decrypt ciphertext produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` if the length is not a whole
    /// number of blocks or the padding is invalid.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::DecryptionFailed);
        }
        Aes128CbcDec::new(&self.0.into(), &ZERO_IV.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl std::fmt::Debug for TransferKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransferKey([REDACTED])")
    }
}

/// Ciphertext length for a plaintext of `len` bytes
#[must_use]
pub fn ciphertext_len(len: usize) -> usize {
    (len / BLOCK_SIZE + 1) * BLOCK_SIZE
}
