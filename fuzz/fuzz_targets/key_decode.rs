//! Fuzz target for key material decoding
//!
//! Covers the stored private key line and public keys received as DER.

#![no_main]

use cipherpost_crypto::{KeyPair, PublicKey, encoding};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = PublicKey::from_der(data);
    let _ = KeyPair::from_pkcs8_der(data);

    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(der) = encoding::decode(s) {
            let _ = KeyPair::from_pkcs8_der(&der);
        }
    }
});
