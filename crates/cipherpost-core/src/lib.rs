//! # cipherpost Core
//!
//! Core protocol implementation for the cipherpost client.
//!
//! This crate provides:
//! - Wire encoding and decoding (fixed-width, little-endian)
//! - Client identity model and its local record
//! - Transfer configuration record
//! - Session state machine: register, exchange keys, upload, verify
//! - Error types and handling
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Session                                  │
//! │   (register → exchange keys → upload → verify checksum/retry)   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                  Identity / TransferItem                         │
//! │   (client id, display name, encrypted upload unit)              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                         Wire                                     │
//! │   (request/response headers, file header, checksum report)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use cipherpost_core::{IdentityFile, Session, TransferInfo};
//! use cipherpost_transport::TransportConfig;
//!
//! # fn main() -> Result<(), cipherpost_core::Error> {
//! let info = TransferInfo::load("transfer.info")?;
//! let store = IdentityFile::new("me.info");
//! let mut session = Session::connect(&info, &TransportConfig::default(), store)?;
//! let report = session.run(&info)?;
//! println!("finished in state {:?}", report.state);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod store;
pub mod transfer;
pub mod wire;

pub use config::{Endpoint, TransferInfo};
pub use error::{Error, ErrorKind, SessionError, ValidationError, WireError};
pub use identity::{ClientId, ClientIdentity, DisplayName};
pub use session::{
    KeyExchange, KeyMaterial, Registration, Session, SessionCounters, SessionReport, SessionState,
    TransferObserver, TransferOutcome,
};
pub use store::{IdentityFile, IdentityRecord, IdentityStore};
pub use transfer::TransferItem;
pub use wire::{
    ChecksumReport, FileHeader, Request, RequestCode, RequestHeader, Response, ResponseCode,
    ResponseHeader,
};

/// Protocol version byte sent by this client
pub const CLIENT_VERSION: u8 = 3;

/// Client identifier size
pub const CLIENT_ID_SIZE: usize = 16;

/// Fixed size of name and filename fields
pub const NAME_SIZE: usize = 255;

/// Request header size: client id, version, code, payload size
pub const REQUEST_HEADER_SIZE: usize = CLIENT_ID_SIZE + 1 + 2 + 4;

/// Response header size: version, code, payload size
pub const RESPONSE_HEADER_SIZE: usize = 1 + 2 + 4;

/// File header size: client id, content size
pub const FILE_HEADER_SIZE: usize = CLIENT_ID_SIZE + 4;

/// Checksum report size: content size, filename, checksum
pub const CHECKSUM_REPORT_SIZE: usize = 4 + NAME_SIZE + 4;

/// Maximum number of file sends per upload
pub const MAX_ATTEMPTS: u32 = 4;

/// Fallback server host
pub const DEFAULT_HOST: std::net::Ipv4Addr = std::net::Ipv4Addr::LOCALHOST;

/// Fallback server port
pub const DEFAULT_PORT: u16 = 1234;
