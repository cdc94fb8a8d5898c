//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error (request never produced a response).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Encryption or decryption failed for one document.
    #[error("crypto error: {0}")]
    Crypto(#[from] courier_crypto::CryptoError),

    /// Local datastore error.
    #[error("datastore error: {0}")]
    Store(#[from] courier_store::StoreError),

    /// Resource/config persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sync bookkeeping references a Resource or Document that does not
    /// exist locally. Indicates corrupted state; retrying cannot fix it.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation that requires a session was reached without one.
    #[error("not logged in")]
    NotLoggedIn,
}
