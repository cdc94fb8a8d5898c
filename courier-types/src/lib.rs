//! Core type definitions for Courier.
//!
//! This crate defines the fundamental types shared between the document
//! store and the sync engine:
//! - Document, account, and resource-group identifiers (opaque strings)
//! - Millisecond wall-clock timestamps
//! - The document model and its closed kind enum
//! - Change events emitted by the local datastore
//!
//! Request-execution types (responses, rendered bodies, etc.) belong in the
//! networking layer, not here.

mod document;
mod ids;
mod timestamp;

pub use document::{ChangeEvent, ChangeKind, Document, DocumentKind, SYNCED_KINDS, UnknownKind};
pub use ids::{AccountId, DocumentId, ResourceGroupId};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),
}
