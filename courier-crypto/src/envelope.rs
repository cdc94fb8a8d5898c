//! Envelope encryption for resource group keys.
//!
//! A group's symmetric key is sealed under the account's X25519 public key
//! before it is sent to the server, so the server only ever stores wrapped
//! keys. The seal uses an ephemeral sender key pair, so any device holding
//! the account secret key can open it without extra coordination.
//!
//! Wire layout (base64): ephemeral public key (32) || nonce (24) || box.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{ContentKey, KEY_SIZE};
use base64::{Engine, engine::general_purpose::STANDARD};
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{Nonce, PublicKey, SalsaBox, SecretKey};
use serde::{Deserialize, Serialize};

/// Size of an X25519 public key in bytes.
const EPHEMERAL_PK_SIZE: usize = 32;

/// Size of the XSalsa20-Poly1305 nonce in bytes.
const BOX_NONCE_SIZE: usize = 24;

/// A group key wrapped under an account public key, in base64 transport
/// form. This is the `encSymmetricKey` field of a resource group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedKey(String);

impl WrappedKey {
    /// Wraps an existing transport string (e.g. received from the server).
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the base64 transport form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WrappedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seals a content key under the given public key.
pub fn wrap_key(public: &PublicKey, key: &ContentKey) -> CryptoResult<WrappedKey> {
    let ephemeral = SecretKey::generate(&mut OsRng);
    let nonce = SalsaBox::generate_nonce(&mut OsRng);

    let sealed = SalsaBox::new(public, &ephemeral)
        .encrypt(&nonce, key.as_bytes().as_slice())
        .map_err(|e| CryptoError::KeyWrap(e.to_string()))?;

    let mut bytes = Vec::with_capacity(EPHEMERAL_PK_SIZE + BOX_NONCE_SIZE + sealed.len());
    bytes.extend_from_slice(ephemeral.public_key().as_bytes());
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&sealed);

    Ok(WrappedKey(STANDARD.encode(&bytes)))
}

/// Opens a wrapped key with the account secret key.
pub fn unwrap_key(secret: &SecretKey, wrapped: &WrappedKey) -> CryptoResult<ContentKey> {
    let bytes = STANDARD
        .decode(wrapped.as_str())
        .map_err(|e| CryptoError::KeyUnwrap(format!("invalid base64: {}", e)))?;

    if bytes.len() <= EPHEMERAL_PK_SIZE + BOX_NONCE_SIZE {
        return Err(CryptoError::KeyUnwrap("data too short".to_string()));
    }

    let mut pk_bytes = [0u8; EPHEMERAL_PK_SIZE];
    pk_bytes.copy_from_slice(&bytes[..EPHEMERAL_PK_SIZE]);
    let ephemeral_pk = PublicKey::from(pk_bytes);

    let nonce = Nonce::clone_from_slice(&bytes[EPHEMERAL_PK_SIZE..EPHEMERAL_PK_SIZE + BOX_NONCE_SIZE]);
    let sealed = &bytes[EPHEMERAL_PK_SIZE + BOX_NONCE_SIZE..];

    let plaintext = SalsaBox::new(&ephemeral_pk, secret)
        .decrypt(&nonce, sealed)
        .map_err(|_| {
            CryptoError::KeyUnwrap("unwrap failed (wrong account key or tampered data)".to_string())
        })?;

    if plaintext.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: plaintext.len(),
        });
    }

    ContentKey::from_slice(&plaintext)
}
