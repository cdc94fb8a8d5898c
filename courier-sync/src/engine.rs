//! The sync orchestrator.
//!
//! One `SyncEngine` exists per app session. It owns the debounce timers
//! and the periodic pull, listens to datastore changes, and runs the push
//! and pull cycles that keep the local resource table and the remote store
//! converged.
//!
//! Cycle shape: a local edit is buffered in the change queue; the queue
//! debounce re-encrypts affected resources and marks them dirty; the push
//! debounce sends dirty resources up; pulls (periodic, or after every
//! push) bring remote effects down and replay them into the datastore
//! tagged `from_sync` so the listener does not loop them back in.

use crate::error::{SyncError, SyncResult};
use crate::keys::GroupKeyCache;
use crate::log::SyncLog;
use crate::protocol::{CreateGroupRequest, PullRequest, ResourceGroupInfo, ResourceStub, ServerResource};
use crate::queue::{ChangeQueue, QueuedChange};
use crate::resource::{Config, NO_VERSION, Resource, SyncMode};
use crate::resource_store::ResourceStore;
use crate::session::Session;
use crate::transport::RemoteTransport;
use courier_crypto::{ContentKey, cipher, envelope};
use courier_store::Datastore;
use courier_types::{ChangeKind, Document, DocumentKind, ResourceGroupId, SYNCED_KINDS};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

/// Timing and enablement knobs for the engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Master switch; when false the engine is inert (`init` no-ops).
    pub enabled: bool,
    /// Quiet period after the last queued change before resources are
    /// re-encrypted (CPU-bound stage).
    pub queue_debounce: Duration,
    /// Quiet period after the last queue flush before dirty resources are
    /// pushed (network-bound stage).
    pub push_debounce: Duration,
    /// Cadence of the periodic full pull.
    pub full_pull_interval: Duration,
    /// Delay before the first pull after `init`.
    pub start_pull_delay: Duration,
    /// Delay before pushing resources that were already dirty at `init`.
    pub start_push_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_debounce: Duration::from_secs(1),
            push_debounce: Duration::from_secs(10),
            full_pull_interval: Duration::from_secs(60),
            start_pull_delay: Duration::from_secs(2),
            start_push_delay: Duration::from_secs(1),
        }
    }
}

/// The sync orchestrator. Construct with [`SyncEngine::new`] and share as
/// `Arc<SyncEngine>`; background tasks hold only weak references, so
/// dropping the last strong handle shuts everything down.
pub struct SyncEngine {
    config: SyncConfig,
    session: Arc<Session>,
    store: Arc<dyn Datastore>,
    resources: Arc<ResourceStore>,
    transport: Arc<dyn RemoteTransport>,
    keys: GroupKeyCache,
    queue: ChangeQueue,
    log: Arc<SyncLog>,
    initialized: AtomicBool,
    queue_timer: Mutex<Option<JoinHandle<()>>>,
    push_timer: Mutex<Option<JoinHandle<()>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        config: SyncConfig,
        session: Arc<Session>,
        store: Arc<dyn Datastore>,
        resources: Arc<ResourceStore>,
        transport: Arc<dyn RemoteTransport>,
    ) -> Arc<Self> {
        let keys = GroupKeyCache::new(transport.clone(), session.clone(), resources.clone());
        Arc::new(Self {
            config,
            session,
            store,
            resources,
            transport,
            keys,
            queue: ChangeQueue::new(),
            log: Arc::new(SyncLog::default()),
            initialized: AtomicBool::new(false),
            queue_timer: Mutex::new(None),
            push_timer: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// The diagnostic log backing the settings screen.
    pub fn log(&self) -> &Arc<SyncLog> {
        &self.log
    }

    /// Whether `init` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Number of changes waiting for the queue debounce.
    pub fn pending_changes(&self) -> usize {
        self.queue.len()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Starts the engine: change listener, initial pull and push, and the
    /// periodic full pull. No-ops when sync is disabled or already
    /// initialized.
    pub fn init(self: &Arc<Self>) {
        if !self.config.enabled {
            self.log.debug("Sync not enabled");
            return;
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            self.log.debug("Sync already initialized");
            return;
        }

        let mut rx = self.store.subscribe();
        let weak = Arc::downgrade(self);
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(batch) => {
                        let Some(engine) = weak.upgrade() else { break };
                        for event in batch {
                            // Replays from sync must not loop back in, and
                            // non-whitelisted kinds never sync.
                            if event.from_sync || !event.document.kind.is_synced() {
                                continue;
                            }
                            engine.queue_change(event.kind, event.document);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "sync change listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let weak = Arc::downgrade(self);
        let start_push_delay = self.config.start_push_delay;
        let initial_push = tokio::spawn(async move {
            tokio::time::sleep(start_push_delay).await;
            if let Some(engine) = weak.upgrade() {
                if let Err(e) = engine.push_dirty(None).await {
                    engine.log.error(format!("Initial push failed: {e}"));
                }
            }
        });

        let weak = Arc::downgrade(self);
        let start_pull_delay = self.config.start_pull_delay;
        let full_pull_interval = self.config.full_pull_interval;
        let periodic_pull = tokio::spawn(async move {
            tokio::time::sleep(start_pull_delay).await;
            loop {
                let Some(engine) = weak.upgrade() else { break };
                if let Err(e) = engine.pull(None, true).await {
                    engine.log.error(format!("Periodic pull failed: {e}"));
                }
                drop(engine);
                tokio::time::sleep(full_pull_interval).await;
            }
        });

        self.tasks
            .lock()
            .unwrap()
            .extend([listener, initial_push, periodic_pull]);
        self.log.debug("Sync initialized");
    }

    /// Runs one full push + pull cycle right now, for "sync now" UI.
    pub async fn trigger_sync(self: &Arc<Self>) -> SyncResult<()> {
        self.init();
        self.push_dirty(None).await?;
        self.pull(None, true).await?;
        Ok(())
    }

    /// First-time setup for an account: pull without creating local
    /// resources (so existing remote state is not clobbered by spurious
    /// local rows), then promote all local documents, then start normal
    /// operation.
    pub async fn initial_sync(self: &Arc<Self>) -> SyncResult<()> {
        self.pull(None, false).await?;
        self.ensure_all_resources(None).await?;
        self.init();
        Ok(())
    }

    /// Stops all background tasks and timers. Also runs on drop.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        if let Some(timer) = self.queue_timer.lock().unwrap().take() {
            timer.abort();
        }
        if let Some(timer) = self.push_timer.lock().unwrap().take() {
            timer.abort();
        }
        self.initialized.store(false, Ordering::SeqCst);
    }

    // ── Change queue ─────────────────────────────────────────────

    /// Buffers a local document change and restarts the queue debounce.
    pub fn queue_change(self: &Arc<Self>, kind: ChangeKind, document: Document) {
        if !self.session.is_logged_in() {
            self.log.warn("Not logged in");
            return;
        }

        self.queue.enqueue(kind, document);

        let weak = Arc::downgrade(self);
        let debounce = self.config.queue_debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Some(engine) = weak.upgrade() {
                engine.flush_queue().await;
            }
        });
        if let Some(old) = self.queue_timer.lock().unwrap().replace(handle) {
            old.abort();
        }
    }

    /// Stages every queued change into its resource row (re-encrypting the
    /// latest snapshot, marking dirty) and restarts the push debounce.
    pub async fn flush_queue(self: &Arc<Self>) {
        let changes = self.queue.drain();
        if changes.is_empty() {
            return;
        }

        let mut staged = 0usize;
        for change in changes {
            match self.stage_change(&change).await {
                Ok(()) => {
                    staged += 1;
                    self.log
                        .debug(format!("Queued {} {}", change.kind, change.document.id));
                }
                Err(e) => {
                    // One bad document must not sink the batch.
                    self.log.error(format!(
                        "Failed to stage {} {}: {e}",
                        change.kind, change.document.id
                    ));
                }
            }
        }

        if staged > 0 {
            self.schedule_push();
        }
    }

    async fn stage_change(&self, change: &QueuedChange) -> SyncResult<()> {
        let doc = &change.document;
        let resource = self.get_or_create_resource_for_doc(doc).await?;
        let enc_content = self.encrypt_doc(&resource.resource_group_id, doc).await?;

        self.resources.update_resource(&Resource {
            name: display_name(doc),
            last_edited: change.queued_at,
            last_edited_by: self.session.account_id()?,
            enc_content,
            removed: change.kind == ChangeKind::Remove,
            dirty: true,
            ..resource
        })
    }

    fn schedule_push(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let debounce = self.config.push_debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Some(engine) = weak.upgrade() {
                if let Err(e) = engine.push_dirty(None).await {
                    engine.log.error(format!("Debounced push failed: {e}"));
                }
            }
        });
        if let Some(old) = self.push_timer.lock().unwrap().replace(handle) {
            old.abort();
        }
    }

    // ── Push ─────────────────────────────────────────────────────

    /// Pushes every dirty resource (optionally scoped to one group) and
    /// applies the server's acks and conflicts. Network failure ends the
    /// cycle without error; dirty flags stay set for the next attempt.
    pub async fn push_dirty(&self, group: Option<&ResourceGroupId>) -> SyncResult<()> {
        if !self.session.is_logged_in() {
            self.log.warn("Not logged in");
            return Ok(());
        }

        let dirty = self.resources.find_dirty(group)?;
        if dirty.is_empty() {
            self.log.debug("No changes to push");
            return Ok(());
        }

        let body: Vec<ServerResource> = dirty.iter().map(ServerResource::from).collect();
        let response = match self.transport.push(&body).await {
            Ok(r) => r,
            Err(e) => {
                self.log.error(format!("Failed to push changes: {e}"));
                return Ok(());
            }
        };

        // Acked resources now carry the server's version and are clean.
        for ack in response
            .updated
            .iter()
            .chain(&response.created)
            .chain(&response.removed)
        {
            let mut resource = self.resources.get_by_doc_id(&ack.id)?.ok_or_else(|| {
                SyncError::NotFound(format!("no resource for pushed id {}", ack.id))
            })?;
            resource.version = ack.version.clone();
            resource.dirty = false;
            self.resources.update_resource(&resource)?;
        }

        for server in &response.conflicts {
            match self.resolve_conflict(server).await {
                Ok(()) => {}
                Err(e @ SyncError::NotFound(_)) => return Err(e),
                Err(e) => self
                    .log
                    .warn(format!("Failed to resolve conflict for {}: {e}", server.id)),
            }
        }

        Ok(())
    }

    /// Last-write-wins conflict resolution. Ties go to the server, and the
    /// server's version token is adopted no matter who wins; a local win
    /// stays dirty so the next push overwrites the server copy.
    async fn resolve_conflict(&self, server: &ServerResource) -> SyncResult<()> {
        let local = self.resources.get_by_doc_id(&server.id)?.ok_or_else(|| {
            SyncError::NotFound(format!("no resource for conflict id {}", server.id))
        })?;

        let server_is_newer = server.last_edited >= local.last_edited;
        self.log.debug(format!(
            "Resolved conflict for {} ({})",
            server.id,
            if server_is_newer { "server" } else { "local" }
        ));

        let winner = if server_is_newer {
            Resource::from_server(server, false)
        } else {
            local
        };
        let resolved = Resource {
            version: server.version.clone(),
            dirty: !server_is_newer,
            ..winner
        };
        self.resources.update_resource(&resolved)?;

        // If the server won, replay its copy locally. Decrypt from the
        // resource row, not the datastore; the document may be gone there.
        if server_is_newer {
            let doc = self
                .decrypt_doc(&resolved.resource_group_id, &resolved.enc_content)
                .await?;
            if resolved.removed {
                self.store.remove(&doc, true)?;
            } else {
                self.store.upsert(doc, true)?;
            }
        }

        Ok(())
    }

    // ── Pull ─────────────────────────────────────────────────────

    /// Pulls remote effects and applies them: created, updated, removals,
    /// then server-requested re-pushes, in that order. Ends by pushing any
    /// resources the last step dirtied. Returns how many resources were
    /// created or updated.
    pub async fn pull(
        &self,
        group: Option<&ResourceGroupId>,
        create_missing: bool,
    ) -> SyncResult<usize> {
        if !self.session.is_logged_in() {
            self.log.warn("Not logged in");
            return Ok(0);
        }

        let candidates = if create_missing {
            self.ensure_all_resources(group).await?
        } else {
            self.resources.all_resources(group)?
        };

        // Scoped pull: everything except the requested group is off the
        // table. Full pull: groups whose config says off sit it out.
        let blacklist: Vec<ResourceGroupId> = match group {
            Some(g) => self
                .resources
                .all_configs()?
                .into_iter()
                .map(|c| c.resource_group_id)
                .filter(|gid| gid != g)
                .collect(),
            None => self
                .resources
                .inactive_configs()?
                .into_iter()
                .map(|c| c.resource_group_id)
                .collect(),
        };

        let request = PullRequest {
            resources: candidates
                .iter()
                .map(|r| ResourceStub {
                    id: r.id.clone(),
                    resource_group_id: r.resource_group_id.clone(),
                    version: r.version.clone(),
                    removed: r.removed,
                })
                .collect(),
            blacklist,
        };
        self.log
            .debug(format!("Pulling with {} resources", request.resources.len()));

        let response = match self.transport.pull(&request).await {
            Ok(r) => r,
            Err(e) => {
                self.log.error(format!("Failed to pull changes: {e}"));
                return Ok(0);
            }
        };

        let mut created = 0usize;
        for server in &response.created_resources {
            let doc = match self
                .decrypt_doc(&server.resource_group_id, &server.enc_content)
                .await
            {
                Ok(doc) => doc,
                Err(e) => {
                    self.log
                        .warn(format!("Failed to decode created resource {}: {e}", server.id));
                    continue;
                }
            };

            if let Err(e) = self
                .resources
                .insert_resource(&Resource::from_server(server, false))
            {
                // Most likely a duplicate row from a rare pull/queue race.
                self.log
                    .error(format!("Failed to insert resource {}: {e}", server.id));
                continue;
            }

            // The document itself may well exist already, e.g. after a
            // logout/login cycle wiped resource rows but not documents.
            self.store.upsert(doc, true)?;
            created += 1;
        }
        if created > 0 {
            self.log.debug(format!("Pull created {created} resources"));
        }

        let mut updated = 0usize;
        for server in &response.updated_resources {
            match self.apply_updated_resource(server).await {
                Ok(()) => updated += 1,
                Err(e) => self
                    .log
                    .warn(format!("Failed to decode updated resource {}: {e}", server.id)),
            }
        }
        if updated > 0 {
            self.log.debug(format!("Pull updated {updated} resources"));
        }

        for id in &response.ids_to_remove {
            let resource = self
                .resources
                .get_by_doc_id(id)?
                .ok_or_else(|| SyncError::NotFound(format!("no resource to remove for {id}")))?;
            let doc = self
                .decrypt_doc(&resource.resource_group_id, &resource.enc_content)
                .await?;

            self.resources.update_resource(&Resource {
                removed: true,
                dirty: false,
                ..resource
            })?;
            self.store.remove(&doc, true)?;
        }

        for id in &response.ids_to_push {
            let mut resource = self
                .resources
                .get_by_doc_id(id)?
                .ok_or_else(|| SyncError::NotFound(format!("no resource to push for {id}")))?;
            resource.dirty = true;
            self.resources.update_resource(&resource)?;
        }

        // The re-push step may have dirtied rows; flush them now rather
        // than waiting for the next debounce.
        self.push_dirty(None).await?;

        Ok(created + updated)
    }

    async fn apply_updated_resource(&self, server: &ServerResource) -> SyncResult<()> {
        let doc = self
            .decrypt_doc(&server.resource_group_id, &server.enc_content)
            .await?;
        self.store.update(doc, true)?;

        self.resources.get_by_doc_id(&server.id)?.ok_or_else(|| {
            SyncError::NotFound(format!("no resource for updated id {}", server.id))
        })?;
        self.resources
            .update_resource(&Resource::from_server(server, false))
    }

    // ── Resources & groups ───────────────────────────────────────

    /// Promotes every whitelisted local document to a resource, creating
    /// missing rows (and resource groups for first-synced workspaces).
    pub async fn ensure_all_resources(
        &self,
        group: Option<&ResourceGroupId>,
    ) -> SyncResult<Vec<Resource>> {
        let started = Instant::now();
        let mut by_id: HashMap<_, _> = self
            .resources
            .all_resources(group)?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        for kind in SYNCED_KINDS {
            for doc in self.store.all(kind) {
                if self.resources.get_by_doc_id(&doc.id)?.is_none() {
                    let resource = self.create_resource_for_doc(&doc).await?;
                    by_id.insert(resource.id.clone(), resource);
                }
            }
        }

        let resources: Vec<Resource> = by_id.into_values().collect();
        self.log.debug(format!(
            "Tracking {} resources ({:.2}s)",
            resources.len(),
            started.elapsed().as_secs_f64()
        ));
        Ok(resources)
    }

    /// Returns the resource tracking `doc`, creating it (and, for a
    /// first-synced workspace, its resource group) when absent.
    pub async fn get_or_create_resource_for_doc(&self, doc: &Document) -> SyncResult<Resource> {
        match self.resources.get_by_doc_id(&doc.id)? {
            Some(resource) => Ok(resource),
            None => self.create_resource_for_doc(doc).await,
        }
    }

    async fn create_resource_for_doc(&self, doc: &Document) -> SyncResult<Resource> {
        let workspace = self
            .workspace_for_doc(doc)?
            .ok_or_else(|| SyncError::NotFound(format!("no workspace for document {}", doc.id)))?;

        let workspace_resource = match self.resources.get_by_doc_id(&workspace.id)? {
            Some(resource) => resource,
            None => {
                let group = self.create_resource_group(&workspace.name).await?;
                self.create_resource(&workspace, &group.id).await?
            }
        };

        if doc.id == workspace.id {
            Ok(workspace_resource)
        } else {
            self.create_resource(doc, &workspace_resource.resource_group_id)
                .await
        }
    }

    fn workspace_for_doc(&self, doc: &Document) -> SyncResult<Option<Document>> {
        let ancestors = self.store.ancestors(doc)?;
        Ok(ancestors
            .into_iter()
            .find(|d| d.kind == DocumentKind::Workspace))
    }

    async fn create_resource_group(&self, name: &str) -> SyncResult<ResourceGroupInfo> {
        let key = ContentKey::generate();
        let wrapped = envelope::wrap_key(&self.session.public_key()?, &key)?;

        let group = match self
            .transport
            .create_resource_group(&CreateGroupRequest {
                name: name.to_string(),
                enc_symmetric_key: wrapped,
            })
            .await
        {
            Ok(group) => group,
            Err(e) => {
                self.log.error(format!("Failed to create resource group: {e}"));
                return Err(e);
            }
        };

        self.keys.insert(group.clone(), key).await;
        self.get_or_create_config(&group.id)?;
        self.log.debug(format!("Created resource group {}", group.id));
        Ok(group)
    }

    async fn create_resource(
        &self,
        doc: &Document,
        group: &ResourceGroupId,
    ) -> SyncResult<Resource> {
        let account = self.session.account_id()?;
        let resource = Resource {
            id: doc.id.clone(),
            kind: doc.kind,
            resource_group_id: group.clone(),
            version: NO_VERSION.to_string(),
            name: display_name(doc),
            created_by: account.clone(),
            last_edited: doc.modified,
            last_edited_by: account,
            removed: false,
            enc_content: self.encrypt_doc(group, doc).await?,
            dirty: true,
        };
        self.resources.insert_resource(&resource)?;
        Ok(resource)
    }

    // ── Configs ──────────────────────────────────────────────────

    /// Returns the group's config, creating one with the default mode
    /// (off) when absent.
    pub fn get_or_create_config(&self, group: &ResourceGroupId) -> SyncResult<Config> {
        match self.resources.get_config(group)? {
            Some(config) => Ok(config),
            None => {
                let config = Config::new(group.clone());
                self.resources.upsert_config(&config)?;
                Ok(config)
            }
        }
    }

    /// Sets the group's sync mode, creating the config when absent.
    pub fn set_sync_mode(&self, group: &ResourceGroupId, mode: SyncMode) -> SyncResult<Config> {
        let config = Config {
            resource_group_id: group.clone(),
            sync_mode: mode,
        };
        self.resources.upsert_config(&config)?;
        Ok(config)
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Logs out: wipes local sync bookkeeping (documents stay), then
    /// clears the session.
    pub async fn logout(&self) -> SyncResult<()> {
        self.reset_local_data()?;
        self.session.log_out();
        Ok(())
    }

    /// Cancels the account server-side, then logs out.
    pub async fn cancel_account(&self) -> SyncResult<()> {
        self.transport.cancel_account().await?;
        self.logout().await
    }

    /// Hard-deletes every local resource and config row.
    pub fn reset_local_data(&self) -> SyncResult<()> {
        self.resources.purge()
    }

    /// Wipes the account's sync data on the server.
    pub async fn reset_remote_data(&self) -> SyncResult<()> {
        self.transport.reset_sync_data().await
    }

    // ── Crypto plumbing ──────────────────────────────────────────

    async fn encrypt_doc(&self, group: &ResourceGroupId, doc: &Document) -> SyncResult<String> {
        let key = self.keys.symmetric_key(group).await?;
        let json = serde_json::to_string(doc)?;
        Ok(cipher::encrypt_string(&key, &json)?)
    }

    async fn decrypt_doc(&self, group: &ResourceGroupId, enc_content: &str) -> SyncResult<Document> {
        let key = self.keys.symmetric_key(group).await?;
        let json = cipher::decrypt_string(&key, enc_content)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn display_name(doc: &Document) -> String {
    if doc.name.is_empty() {
        "n/a".to_string()
    } else {
        doc.name.clone()
    }
}
