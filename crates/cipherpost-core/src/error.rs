//! Error types for the cipherpost core protocol.

use thiserror::Error;

/// Core protocol errors
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, send or receive failure
    #[error("transport error: {0}")]
    Transport(#[from] cipherpost_transport::TransportError),

    /// Bytes on the wire could not be decoded
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Key generation, key unwrap or encryption failure
    #[error("crypto error: {0}")]
    Crypto(#[from] cipherpost_crypto::CryptoError),

    /// Input failed validation
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Local record or source file could not be read or written
    #[error("persistence error: {0}")]
    Persistence(#[from] cipherpost_files::FileError),

    /// Step invoked out of order or server answered unexpectedly
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Transport`]
    Transport,
    /// See [`Error::Wire`]
    MalformedHeader,
    /// See [`Error::Crypto`]
    Crypto,
    /// See [`Error::Validation`]
    Validation,
    /// See [`Error::Persistence`]
    Persistence,
    /// See [`Error::Session`]
    Session,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Wire(_) => ErrorKind::MalformedHeader,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Session(_) => ErrorKind::Session,
        }
    }
}

/// Wire-level errors
#[derive(Debug, Error)]
pub enum WireError {
    /// Fewer bytes than a fixed-width structure needs
    #[error("malformed {what}: expected {expected} bytes, got {actual}")]
    MalformedHeader {
        /// Structure being decoded
        what: &'static str,
        /// Required size
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Declared payload larger than any response this client accepts
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Declared size
        size: u32,
        /// Maximum accepted
        max: u32,
    },

    /// Unknown request code
    #[error("unknown request code: {0}")]
    UnknownRequestCode(u16),
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Client id text is not 32 hex digits
    #[error("invalid client id: {0:?}")]
    InvalidClientId(String),

    /// Required field is missing from a local record
    #[error("missing {field} in {record}")]
    MissingField {
        /// Field name
        field: &'static str,
        /// Record name
        record: &'static str,
    },

    /// Content does not fit the 32-bit size field
    #[error("content too large: {0} bytes")]
    ContentTooLarge(usize),

    /// Payload does not have the length its layout requires
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Field being checked
        what: &'static str,
        /// Required length
        expected: usize,
        /// Actual length
        actual: usize,
    },
}

/// Session-level errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Invalid state for the requested operation
    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidState {
        /// Current state
        from: crate::session::SessionState,
        /// Requested state
        to: crate::session::SessionState,
    },

    /// A step needs a client id and none is known
    #[error("no client id: registration required")]
    NotRegistered,

    /// Server sent a known code that does not answer the current step
    #[error("unexpected response {code} while {step}")]
    UnexpectedResponse {
        /// What the session was waiting for
        step: &'static str,
        /// Response code received
        code: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherpost_crypto::CryptoError;
    use cipherpost_transport::TransportError;

    #[test]
    fn test_kind() {
        let err: Error = TransportError::Closed.into();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err: Error = WireError::MalformedHeader {
            what: "response header",
            expected: 7,
            actual: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::MalformedHeader);

        let err: Error = CryptoError::DecryptionFailed.into();
        assert_eq!(err.kind(), ErrorKind::Crypto);

        let err: Error = ValidationError::InvalidClientId("xyz".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: Error = SessionError::NotRegistered.into();
        assert_eq!(err.kind(), ErrorKind::Session);
    }

    #[test]
    fn test_display() {
        let err = WireError::MalformedHeader {
            what: "file header",
            expected: 20,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "malformed file header: expected 20 bytes, got 4"
        );
    }
}
