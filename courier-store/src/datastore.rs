//! The datastore trait consumed by the sync engine.

use crate::error::StoreResult;
use courier_types::{ChangeEvent, Document, DocumentId, DocumentKind};
use tokio::sync::broadcast;

/// A batch of change events, delivered in write order.
pub type ChangeBatch = Vec<ChangeEvent>;

/// Document CRUD plus change notification.
///
/// Implementations must thread the `from_sync` flag of every write through
/// to the emitted [`ChangeEvent`]s, and must deliver events for a single
/// write in a fully-formed batch (a listener never observes half a write).
pub trait Datastore: Send + Sync {
    /// Subscribes to change batches. Every subscriber sees every batch
    /// emitted after the call; dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<ChangeBatch>;

    /// Returns the document with the given kind and id, if present.
    fn get(&self, kind: DocumentKind, id: &DocumentId) -> Option<Document>;

    /// Returns all documents of a kind.
    fn all(&self, kind: DocumentKind) -> Vec<Document>;

    /// Returns all documents of a kind matching the predicate.
    fn find(&self, kind: DocumentKind, predicate: &dyn Fn(&Document) -> bool) -> Vec<Document>;

    /// Inserts a new document. Fails if the id already exists.
    fn insert(&self, doc: Document) -> StoreResult<()>;

    /// Updates an existing document. Fails if absent.
    fn update(&self, doc: Document, from_sync: bool) -> StoreResult<()>;

    /// Inserts or updates, whichever applies.
    fn upsert(&self, doc: Document, from_sync: bool) -> StoreResult<()>;

    /// Removes a document. Removing an absent document is a no-op
    /// (it may already have been deleted by an earlier replay).
    fn remove(&self, doc: &Document, from_sync: bool) -> StoreResult<()>;

    /// Returns the chain from `doc` to the tree root, starting with `doc`
    /// itself. The walk is iterative over parent pointers; a looping or
    /// dangling parent chain fails loudly rather than recursing forever.
    fn ancestors(&self, doc: &Document) -> StoreResult<Vec<Document>>;
}
