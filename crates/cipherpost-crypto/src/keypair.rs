//! RSA keypair used for the key exchange.
//!
//! The client generates a fresh keypair for each key exchange, sends the
//! public half to the server, and unwraps the transfer key the server
//! returns. The public key is encoded as X.509 `SubjectPublicKeyInfo` DER,
//! which for a 1024-bit modulus and exponent 17 is exactly
//! [`PUBLIC_KEY_SIZE`] bytes.

use crate::error::CryptoError;
use crate::symmetric::TransferKey;
use crate::{PUBLIC_KEY_SIZE, RSA_KEY_BITS, RSA_PUBLIC_EXPONENT};
use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use zeroize::Zeroizing;

/// RSA private key with its public half
///
/// The underlying key zeroizes its secret components on drop.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a new 1024-bit keypair with public exponent 17.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyGeneration` if prime generation fails.
    pub fn generate() -> Result<Self, CryptoError> {
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
        let private = RsaPrivateKey::new_with_exp(&mut OsRng, RSA_KEY_BITS, &exponent)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        tracing::debug!("Generated {}-bit RSA keypair", RSA_KEY_BITS);
        Ok(Self { private })
    }

    /// Load a private key from PKCS#8 DER.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPrivateKey` if the DER is malformed.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { private })
    }

    /// Encode the private key as PKCS#8 DER.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPrivateKey` if encoding fails.
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let document = self
            .private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    /// Public half of the keypair
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: RsaPublicKey::from(&self.private),
        }
    }

    /// Unwrap an `OAEP`-encrypted transfer key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` if the ciphertext does not
    /// decrypt under this key, or `CryptoError::InvalidKeyLength` if the
    /// recovered key is not 16 bytes.
    pub fn unwrap_transfer_key(&self, ciphertext: &[u8]) -> Result<TransferKey, CryptoError> {
        let plaintext = Zeroizing::new(
            self.private
                .decrypt(Oaep::new::<Sha1>(), ciphertext)
                .map_err(|_| CryptoError::DecryptionFailed)?,
        );
        TransferKey::from_slice(&plaintext)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &RSA_KEY_BITS)
            .finish_non_exhaustive()
    }
}

/// RSA public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Decode from `SubjectPublicKeyInfo` DER.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPublicKey` if the DER is malformed.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let inner = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Encode as `SubjectPublicKeyInfo` DER, exactly [`PUBLIC_KEY_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPublicKey` if encoding fails or the
    /// key does not encode to the wire size.
    pub fn to_der(&self) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
        let document = self
            .inner
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        let bytes = document.as_bytes();
        <[u8; PUBLIC_KEY_SIZE]>::try_from(bytes).map_err(|_| {
            CryptoError::InvalidPublicKey(format!(
                "encoded size {} (expected {})",
                bytes.len(),
                PUBLIC_KEY_SIZE
            ))
        })
    }

    /// Wrap a transfer key with `OAEP`, as the server does.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EncryptionFailed` on failure.
    pub fn wrap_transfer_key(&self, key: &TransferKey) -> Result<Vec<u8>, CryptoError> {
        self.inner
            .encrypt(&mut OsRng, Oaep::new::<Sha1>(), key.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)
    }
}
