//! # cipherpost Crypto
//!
//! Cryptographic primitives for the cipherpost client.
//!
//! This crate provides:
//! - RSA keypair generation and `OAEP` unwrapping of the transfer key
//! - AES-CBC encryption of file content under the transfer key
//! - Text encoding of key material for the local identity record
//! - Secure random number generation
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Notes |
//! |----------|-----------|-------|
//! | Key Exchange | RSA-1024, e = 17 | public key sent as X.509 `SubjectPublicKeyInfo` DER |
//! | Key Transport | RSA-OAEP with SHA-1 | server wraps a 16-byte key |
//! | File Encryption | AES-128-CBC, PKCS#7 | all-zero IV |
//! | Key Storage | PKCS#8 DER, base64 | one line of `me.info` |
//!
//! The suite is fixed by the server this client talks to.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod error;
pub mod keypair;
pub mod random;
pub mod symmetric;

pub use error::CryptoError;
pub use keypair::{KeyPair, PublicKey};
pub use symmetric::TransferKey;

/// RSA modulus size in bits
pub const RSA_KEY_BITS: usize = 1024;

/// RSA public exponent
pub const RSA_PUBLIC_EXPONENT: u32 = 17;

/// Encoded public key size on the wire
pub const PUBLIC_KEY_SIZE: usize = 160;

/// Transfer key size (AES-128)
pub const TRANSFER_KEY_SIZE: usize = 16;

/// AES block size
pub const BLOCK_SIZE: usize = 16;
