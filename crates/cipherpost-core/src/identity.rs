//! Client identity model.
//!
//! The server assigns each client a 16-byte id at registration. Locally it
//! is kept as 32 lowercase hex digits; on the wire it is the raw bytes.

use crate::error::ValidationError;
use crate::{CLIENT_ID_SIZE, NAME_SIZE};
use std::fmt;
use std::str::FromStr;

/// True iff `s` is exactly 32 hex digits (either case)
#[must_use]
pub fn validate_hex(s: &str) -> bool {
    s.len() == CLIENT_ID_SIZE * 2 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decode 32 hex digits into 16 bytes.
///
/// # Errors
///
/// Returns `ValidationError::InvalidClientId` unless [`validate_hex`]
/// accepts `s`.
pub fn hex_to_bytes(s: &str) -> Result<[u8; CLIENT_ID_SIZE], ValidationError> {
    if !validate_hex(s) {
        return Err(ValidationError::InvalidClientId(s.to_string()));
    }
    let mut bytes = [0u8; CLIENT_ID_SIZE];
    hex::decode_to_slice(s, &mut bytes)
        .map_err(|_| ValidationError::InvalidClientId(s.to_string()))?;
    Ok(bytes)
}

/// Encode 16 bytes as 32 lowercase hex digits
#[must_use]
pub fn bytes_to_hex(bytes: &[u8; CLIENT_ID_SIZE]) -> String {
    hex::encode(bytes)
}

/// Server-assigned client identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClientId([u8; CLIENT_ID_SIZE]);

impl ClientId {
    /// All-zero id sent before registration
    pub const ZERO: Self = Self([0u8; CLIENT_ID_SIZE]);

    /// Wrap raw bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; CLIENT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CLIENT_ID_SIZE] {
        &self.0
    }

    /// Lowercase hex form
    #[must_use]
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    /// True for the pre-registration id
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; CLIENT_ID_SIZE]
    }
}

impl FromStr for ClientId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_to_bytes(s).map(Self)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.to_hex())
    }
}

/// Client display name, at most 255 bytes.
///
/// Longer names are cut at the last UTF-8 boundary that fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    /// Create a name, truncating if needed
    pub fn new(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.len() > NAME_SIZE {
            let mut cut = NAME_SIZE;
            while !name.is_char_boundary(cut) {
                cut -= 1;
            }
            name.truncate(cut);
        }
        Self(name)
    }

    /// Name as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for an empty name
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered client: display name plus server-assigned id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Display name
    pub name: DisplayName,
    /// Assigned id
    pub id: ClientId,
}

impl ClientIdentity {
    /// Create an identity
    #[must_use]
    pub fn new(name: DisplayName, id: ClientId) -> Self {
        Self { name, id }
    }
}
