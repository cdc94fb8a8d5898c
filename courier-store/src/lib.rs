//! Local document datastore boundary for Courier.
//!
//! The sync engine does not own document storage; it consumes it through
//! the [`Datastore`] trait: CRUD plus change-event subscription. Writes
//! carry a `from_sync` flag that is threaded through to the emitted change
//! events, so the sync engine can tell its own replays apart from user
//! edits.
//!
//! [`MemoryStore`] is the in-process reference implementation used by the
//! app shell while a document is open and by every test in the workspace.

mod datastore;
mod error;
mod memory;

pub use datastore::{ChangeBatch, Datastore};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
