//! Pending-change buffer for the two-stage debounce.
//!
//! Edits land here keyed by `(document id, change kind)`, so a burst of
//! keystrokes on one request collapses to the latest snapshot before the
//! flush re-encrypts anything. Draining snapshots-then-clears, so changes
//! arriving mid-flush land in the next batch instead of being lost.

use courier_types::{ChangeKind, Document, DocumentId, Timestamp};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueueKey {
    id: DocumentId,
    kind: ChangeKind,
}

/// One buffered change: the latest snapshot for its queue key.
#[derive(Debug, Clone)]
pub struct QueuedChange {
    pub kind: ChangeKind,
    pub document: Document,
    /// When the change was enqueued; becomes the resource's `last_edited`.
    pub queued_at: Timestamp,
}

/// Coalescing buffer of local document changes.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: Mutex<HashMap<QueueKey, QueuedChange>>,
}

impl ChangeQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a change, overwriting any pending entry for the same
    /// `(document id, kind)` key.
    pub fn enqueue(&self, kind: ChangeKind, document: Document) {
        let key = QueueKey {
            id: document.id.clone(),
            kind,
        };
        self.pending.lock().unwrap().insert(
            key,
            QueuedChange {
                kind,
                document,
                queued_at: Timestamp::now(),
            },
        );
    }

    /// Takes the pending batch, leaving the queue empty.
    pub fn drain(&self) -> Vec<QueuedChange> {
        let snapshot = {
            let mut pending = self.pending.lock().unwrap();
            std::mem::take(&mut *pending)
        };
        snapshot.into_values().collect()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_types::DocumentKind;

    #[test]
    fn same_key_coalesces_to_latest_snapshot() {
        let queue = ChangeQueue::new();
        let mut doc = Document::new(DocumentKind::Request, "v1");

        for i in 2..=5 {
            queue.enqueue(ChangeKind::Update, doc.clone());
            doc.name = format!("v{i}");
        }
        queue.enqueue(ChangeKind::Update, doc.clone());

        assert_eq!(queue.len(), 1);
        let drained = queue.drain();
        assert_eq!(drained[0].document.name, "v5");
        assert!(queue.is_empty());
    }

    #[test]
    fn different_kinds_keep_separate_entries() {
        let queue = ChangeQueue::new();
        let doc = Document::new(DocumentKind::Request, "r");

        queue.enqueue(ChangeKind::Update, doc.clone());
        queue.enqueue(ChangeKind::Remove, doc);

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_leaves_room_for_new_changes() {
        let queue = ChangeQueue::new();
        queue.enqueue(ChangeKind::Insert, Document::new(DocumentKind::Request, "a"));

        let first = queue.drain();
        assert_eq!(first.len(), 1);

        queue.enqueue(ChangeKind::Insert, Document::new(DocumentKind::Request, "b"));
        assert_eq!(queue.len(), 1);
    }
}
