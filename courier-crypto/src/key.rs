//! Key material: group content keys and the account key pair.

use crate::error::{CryptoError, CryptoResult};
use crypto_box::aead::OsRng;
use crypto_box::{PublicKey, SecretKey};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of symmetric content keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// A resource group's symmetric content key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey {
    bytes: [u8; KEY_SIZE],
}

impl ContentKey {
    /// Generates a fresh random content key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a slice, checking the length.
    pub fn from_slice(slice: &[u8]) -> CryptoResult<Self> {
        if slice.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The account's X25519 key pair used for wrapping group keys.
///
/// The secret half never leaves the client; the public half is registered
/// with the account so the server (and other devices) can address wrapped
/// keys to it.
#[derive(Clone)]
pub struct AccountKeyPair {
    secret: SecretKey,
}

impl AccountKeyPair {
    /// Generates a fresh key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::generate(&mut OsRng),
        }
    }

    /// Restores a key pair from the stored secret key bytes.
    pub fn from_secret_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            secret: SecretKey::from(bytes),
        }
    }

    /// Returns the public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Returns the secret key.
    #[must_use]
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Returns the secret key bytes for persistence in the OS keychain.
    #[must_use]
    pub fn secret_bytes(&self) -> [u8; KEY_SIZE] {
        self.secret.to_bytes()
    }
}

impl std::fmt::Debug for AccountKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKeyPair")
            .field("secret", &"[REDACTED]")
            .field("public", &self.public_key())
            .finish()
    }
}
