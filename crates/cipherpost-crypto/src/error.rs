//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// RSA key generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decryption failed (bad padding or wrong key)
    #[error("decryption failed")]
    DecryptionFailed,

    /// Invalid key length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Public key could not be encoded or decoded
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Private key could not be encoded or decoded
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Text encoding of key material is malformed
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Random number generation failed
    #[error("random number generation failed")]
    RandomFailed,
}
