//! In-memory datastore implementation.

use crate::datastore::{ChangeBatch, Datastore};
use crate::error::{StoreError, StoreResult};
use courier_types::{ChangeEvent, ChangeKind, Document, DocumentId, DocumentKind};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the change broadcast channel. A slow subscriber that lags
/// past this many batches misses the overwritten ones.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-process document store backed by a hash map.
pub struct MemoryStore {
    docs: RwLock<HashMap<DocumentId, Document>>,
    changes: broadcast::Sender<ChangeBatch>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            docs: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Number of documents of any kind.
    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.read().unwrap().is_empty()
    }

    fn emit(&self, kind: ChangeKind, document: Document, from_sync: bool) {
        trace!(%kind, id = %document.id, from_sync, "datastore change");
        // Nobody listening is fine.
        let _ = self.changes.send(vec![ChangeEvent {
            kind,
            document,
            from_sync,
        }]);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Datastore for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeBatch> {
        self.changes.subscribe()
    }

    fn get(&self, kind: DocumentKind, id: &DocumentId) -> Option<Document> {
        self.docs
            .read()
            .unwrap()
            .get(id)
            .filter(|d| d.kind == kind)
            .cloned()
    }

    fn all(&self, kind: DocumentKind) -> Vec<Document> {
        self.docs
            .read()
            .unwrap()
            .values()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    fn find(&self, kind: DocumentKind, predicate: &dyn Fn(&Document) -> bool) -> Vec<Document> {
        self.docs
            .read()
            .unwrap()
            .values()
            .filter(|d| d.kind == kind && predicate(d))
            .cloned()
            .collect()
    }

    fn insert(&self, doc: Document) -> StoreResult<()> {
        {
            let mut docs = self.docs.write().unwrap();
            if docs.contains_key(&doc.id) {
                return Err(StoreError::AlreadyExists(doc.id));
            }
            docs.insert(doc.id.clone(), doc.clone());
        }
        self.emit(ChangeKind::Insert, doc, false);
        Ok(())
    }

    fn update(&self, doc: Document, from_sync: bool) -> StoreResult<()> {
        {
            let mut docs = self.docs.write().unwrap();
            if !docs.contains_key(&doc.id) {
                return Err(StoreError::NotFound(doc.id));
            }
            docs.insert(doc.id.clone(), doc.clone());
        }
        self.emit(ChangeKind::Update, doc, from_sync);
        Ok(())
    }

    fn upsert(&self, doc: Document, from_sync: bool) -> StoreResult<()> {
        let existed = {
            let mut docs = self.docs.write().unwrap();
            docs.insert(doc.id.clone(), doc.clone()).is_some()
        };
        let kind = if existed {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        self.emit(kind, doc, from_sync);
        Ok(())
    }

    fn remove(&self, doc: &Document, from_sync: bool) -> StoreResult<()> {
        let removed = self.docs.write().unwrap().remove(&doc.id);
        if let Some(removed) = removed {
            self.emit(ChangeKind::Remove, removed, from_sync);
        }
        Ok(())
    }

    fn ancestors(&self, doc: &Document) -> StoreResult<Vec<Document>> {
        let docs = self.docs.read().unwrap();
        let mut chain = vec![doc.clone()];
        let mut seen: HashSet<DocumentId> = HashSet::from([doc.id.clone()]);

        let mut current = doc.clone();
        while let Some(parent_id) = current.parent_id.clone() {
            if !seen.insert(parent_id.clone()) {
                return Err(StoreError::ParentCycle(parent_id));
            }
            let parent = docs.get(&parent_id).ok_or(StoreError::MissingParent {
                child: current.id.clone(),
                parent: parent_id,
            })?;
            chain.push(parent.clone());
            current = parent.clone();
        }

        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_types::DocumentKind;

    #[test]
    fn get_filters_by_kind() {
        let store = MemoryStore::new();
        let doc = Document::new(DocumentKind::Request, "r");
        let id = doc.id.clone();
        store.insert(doc).unwrap();

        assert!(store.get(DocumentKind::Request, &id).is_some());
        assert!(store.get(DocumentKind::Workspace, &id).is_none());
    }
}
