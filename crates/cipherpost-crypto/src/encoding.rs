//! Text encoding of key material.
//!
//! The private key lives on one line of the identity record as standard
//! base64. Decoding skips embedded whitespace so keys wrapped by other
//! tools still load.

use crate::CryptoError;
use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Encode bytes as standard base64
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64, ignoring whitespace
///
/// # Errors
///
/// Returns `CryptoError::InvalidEncoding` if the text is not valid base64.
pub fn decode(text: &str) -> Result<Vec<u8>, CryptoError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}
