//! # cipherpost Files
//!
//! Local file handling for the cipherpost client.
//!
//! This crate provides:
//! - POSIX `cksum` (CRC-32, polynomial `0x04C11DB7`) over plaintext content
//! - 1-indexed line-oriented records used for configuration and identity
//! - Whole-file loading of the upload source

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checksum;
pub mod error;
pub mod lines;
pub mod source;

pub use checksum::{Cksum, cksum};
pub use error::FileError;
pub use lines::LineFile;
pub use source::SourceFile;

/// Largest plaintext accepted for upload.
///
/// The wire carries content sizes in 32 bits and CBC padding adds up to one
/// block, so the plaintext must leave room for it.
pub const MAX_CONTENT_SIZE: u64 = u32::MAX as u64 - 16;
