use courier_store::{Datastore, MemoryStore, StoreError};
use courier_types::{ChangeKind, Document, DocumentId, DocumentKind};
use pretty_assertions::assert_eq;

fn workspace(name: &str) -> Document {
    Document::new(DocumentKind::Workspace, name)
}

fn request_in(parent: &Document, name: &str) -> Document {
    Document::new(DocumentKind::Request, name).with_parent(&parent.id)
}

// ── CRUD ─────────────────────────────────────────────────────────

#[test]
fn insert_then_get() {
    let store = MemoryStore::new();
    let doc = workspace("W");
    let id = doc.id.clone();
    store.insert(doc).unwrap();

    let loaded = store.get(DocumentKind::Workspace, &id).unwrap();
    assert_eq!(loaded.name, "W");
}

#[test]
fn insert_duplicate_fails() {
    let store = MemoryStore::new();
    let doc = workspace("W");
    store.insert(doc.clone()).unwrap();
    assert!(matches!(
        store.insert(doc),
        Err(StoreError::AlreadyExists(_))
    ));
}

#[test]
fn update_missing_fails() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.update(workspace("W"), false),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn upsert_inserts_then_updates() {
    let store = MemoryStore::new();
    let mut doc = workspace("W");
    store.upsert(doc.clone(), false).unwrap();

    doc.name = "W2".to_string();
    store.upsert(doc.clone(), true).unwrap();

    let loaded = store.get(DocumentKind::Workspace, &doc.id).unwrap();
    assert_eq!(loaded.name, "W2");
    assert_eq!(store.len(), 1);
}

#[test]
fn remove_is_idempotent() {
    let store = MemoryStore::new();
    let doc = workspace("W");
    store.insert(doc.clone()).unwrap();
    store.remove(&doc, false).unwrap();
    store.remove(&doc, false).unwrap();
    assert!(store.is_empty());
}

#[test]
fn all_and_find_filter_by_kind() {
    let store = MemoryStore::new();
    let ws = workspace("W");
    store.insert(ws.clone()).unwrap();
    store.insert(request_in(&ws, "one")).unwrap();
    store.insert(request_in(&ws, "two")).unwrap();

    assert_eq!(store.all(DocumentKind::Request).len(), 2);
    assert_eq!(store.all(DocumentKind::Workspace).len(), 1);

    let found = store.find(DocumentKind::Request, &|d| d.name == "two");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "two");
}

// ── Change events ────────────────────────────────────────────────

#[tokio::test]
async fn writes_emit_tagged_batches() {
    let store = MemoryStore::new();
    let mut rx = store.subscribe();

    let doc = workspace("W");
    store.insert(doc.clone()).unwrap();
    store.update(doc.clone(), true).unwrap();
    store.remove(&doc, false).unwrap();

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch[0].kind, ChangeKind::Insert);
    assert!(!batch[0].from_sync);

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch[0].kind, ChangeKind::Update);
    assert!(batch[0].from_sync);

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch[0].kind, ChangeKind::Remove);
    assert!(!batch[0].from_sync);
}

// ── Ancestor walk ────────────────────────────────────────────────

#[test]
fn ancestors_walk_to_the_root() {
    let store = MemoryStore::new();
    let ws = workspace("W");
    let folder = Document::new(DocumentKind::RequestGroup, "F").with_parent(&ws.id);
    let req = Document::new(DocumentKind::Request, "R").with_parent(&folder.id);

    store.insert(ws.clone()).unwrap();
    store.insert(folder.clone()).unwrap();
    store.insert(req.clone()).unwrap();

    let chain = store.ancestors(&req).unwrap();
    let ids: Vec<_> = chain.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids, vec![req.id, folder.id, ws.id]);
}

#[test]
fn ancestors_of_a_root_is_itself() {
    let store = MemoryStore::new();
    let ws = workspace("W");
    store.insert(ws.clone()).unwrap();

    let chain = store.ancestors(&ws).unwrap();
    assert_eq!(chain.len(), 1);
}

#[test]
fn parent_cycle_fails_loudly() {
    let store = MemoryStore::new();
    let mut a = Document::new(DocumentKind::RequestGroup, "A");
    let b = Document::new(DocumentKind::RequestGroup, "B").with_parent(&a.id);
    a.parent_id = Some(b.id.clone());

    store.insert(a.clone()).unwrap();
    store.insert(b).unwrap();

    assert!(matches!(
        store.ancestors(&a),
        Err(StoreError::ParentCycle(_))
    ));
}

#[test]
fn dangling_parent_fails_loudly() {
    let store = MemoryStore::new();
    let ghost = DocumentId::new("wrk_gone");
    let orphan = Document::new(DocumentKind::Request, "R").with_parent(&ghost);
    store.insert(orphan.clone()).unwrap();

    assert!(matches!(
        store.ancestors(&orphan),
        Err(StoreError::MissingParent { .. })
    ));
}
