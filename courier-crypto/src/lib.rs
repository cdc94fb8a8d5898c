//! Encryption layer for Courier sync.
//!
//! Two primitives cover everything the sync engine needs:
//!
//! 1. **Content encryption** — ChaCha20-Poly1305 AEAD over the JSON form of
//!    a document, keyed by the owning resource group's symmetric key
//!    ([`cipher`]).
//! 2. **Key wrapping** — each group key travels to the server sealed under
//!    the account's X25519 public key, and is only ever opened client-side
//!    with the account secret key ([`envelope`]).
//!
//! All operations are pure functions over byte buffers; failures surface as
//! [`CryptoError`] and must not be swallowed — a failed encrypt/decrypt
//! aborts that one document's sync step, never the whole cycle.

pub mod cipher;
mod error;
pub mod envelope;
mod key;

pub use cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use envelope::WrappedKey;
pub use error::{CryptoError, CryptoResult};
pub use key::{AccountKeyPair, ContentKey, KEY_SIZE};

pub use crypto_box::{PublicKey, SecretKey};
