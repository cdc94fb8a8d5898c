//! Encrypted multi-device sync engine for Courier.
//!
//! Takes local document mutations (requests, folders, workspaces,
//! environments, cookie jars), encrypts them per resource group, and
//! reconciles them against the remote store through a polling push/pull
//! protocol — while the local datastore keeps being mutated by the user.
//!
//! # Architecture
//!
//! - **Protocol**: wire types for the push/pull endpoints
//! - **Transport**: authenticated HTTP calls, behind a trait for testing
//! - **ResourceStore**: SQLite rows tracking one resource per synced
//!   document, plus per-group sync-mode configs
//! - **GroupKeyCache**: single-flight fetch + unwrap of per-group keys
//! - **Engine**: debounced change queue, push/pull cycles, last-write-wins
//!   conflict resolution, from-sync replay into the datastore
//!
//! # Sync flow
//!
//! 1. A datastore change lands in the engine's queue (whitelisted kinds
//!    only; replays tagged `from_sync` are dropped at the door)
//! 2. The queue debounce re-encrypts affected resources and marks them
//!    dirty; the longer push debounce batches the network round trip
//! 3. Push uploads dirty resources; the server acks versions or reports
//!    conflicts, which resolve by last edit (ties to the server)
//! 4. Pull (periodic, and after every push) diffs server state against
//!    local resources and replays creates/updates/removes back into the
//!    datastore, tagged `from_sync`
//!
//! # Example
//!
//! ```no_run
//! use courier_store::MemoryStore;
//! use courier_sync::{HttpTransport, ResourceStore, Session, SyncConfig, SyncEngine};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), courier_sync::SyncError> {
//! let session = Arc::new(Session::new());
//! let store = Arc::new(MemoryStore::new());
//! let resources = Arc::new(ResourceStore::open_in_memory()?);
//! let transport = Arc::new(HttpTransport::new("https://api.courier.dev", session.clone()));
//!
//! let engine = SyncEngine::new(
//!     SyncConfig { enabled: true, ..Default::default() },
//!     session,
//!     store,
//!     resources,
//!     transport,
//! );
//! engine.init();
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod keys;
mod log;
pub mod protocol;
mod queue;
mod resource;
mod resource_store;
mod session;
pub mod transport;

pub use engine::{SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use keys::GroupKeyCache;
pub use log::{DEFAULT_LOG_CAPACITY, LogLevel, LogLine, SyncLog};
pub use protocol::{
    CreateGroupRequest, PullRequest, PullResponse, PushResponse, ResourceGroupInfo, ResourceStub,
    ServerResource, VersionRef,
};
pub use queue::{ChangeQueue, QueuedChange};
pub use resource::{Config, NO_VERSION, Resource, SyncMode};
pub use resource_store::ResourceStore;
pub use session::{Account, Session};
pub use transport::{HttpTransport, RemoteTransport};
