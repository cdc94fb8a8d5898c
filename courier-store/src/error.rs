//! Error types for the datastore boundary.

use courier_types::DocumentId;
use thiserror::Error;

/// Result type for datastore operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in datastore operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// Insert collided with an existing document id.
    #[error("document already exists: {0}")]
    AlreadyExists(DocumentId),

    /// The parent chain of a document loops back on itself.
    /// Indicates corrupted local data; never retried.
    #[error("parent cycle detected at {0}")]
    ParentCycle(DocumentId),

    /// A parent id points at a document that does not exist.
    #[error("missing parent {parent} for document {child}")]
    MissingParent { child: DocumentId, parent: DocumentId },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
