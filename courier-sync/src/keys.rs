//! Resource group key cache.
//!
//! Group metadata and unwrapped symmetric keys are fetched once and kept
//! for the process lifetime (groups never change and keys never rotate in
//! this design). Concurrent first requests for the same group collapse
//! into a single fetch through a per-group gate; a failed fetch caches
//! nothing, so the next caller retries cleanly.

use crate::error::SyncResult;
use crate::protocol::ResourceGroupInfo;
use crate::resource_store::ResourceStore;
use crate::session::Session;
use crate::transport::RemoteTransport;
use courier_crypto::{ContentKey, envelope};
use courier_types::ResourceGroupId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Memoized map from group id to its metadata and content key.
pub struct GroupKeyCache {
    transport: Arc<dyn RemoteTransport>,
    session: Arc<Session>,
    resources: Arc<ResourceStore>,
    keys: Mutex<HashMap<ResourceGroupId, ContentKey>>,
    groups: Mutex<HashMap<ResourceGroupId, ResourceGroupInfo>>,
    gates: Mutex<HashMap<ResourceGroupId, Arc<Mutex<()>>>>,
}

impl GroupKeyCache {
    /// Creates an empty cache.
    pub fn new(
        transport: Arc<dyn RemoteTransport>,
        session: Arc<Session>,
        resources: Arc<ResourceStore>,
    ) -> Self {
        Self {
            transport,
            session,
            resources,
            keys: Mutex::new(HashMap::new()),
            groups: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the group's symmetric content key, fetching and unwrapping
    /// it on first use.
    pub async fn symmetric_key(&self, group_id: &ResourceGroupId) -> SyncResult<ContentKey> {
        if let Some(key) = self.keys.lock().await.get(group_id) {
            return Ok(key.clone());
        }

        // Serialize concurrent first fetches of the same group.
        let gate = {
            let mut gates = self.gates.lock().await;
            gates
                .entry(group_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _fetching = gate.lock().await;

        // Another caller may have finished while we waited on the gate.
        if let Some(key) = self.keys.lock().await.get(group_id) {
            return Ok(key.clone());
        }

        let group = self.transport.fetch_resource_group(group_id).await?;

        // First sight of this group on this device; make sure a config row
        // exists so pull blacklisting sees a deliberate mode, not a gap.
        if self.resources.get_config(group_id)?.is_none() {
            self.resources
                .upsert_config(&crate::resource::Config::new(group_id.clone()))?;
        }

        let secret = self.session.secret_key()?;
        let key = envelope::unwrap_key(&secret, &group.enc_symmetric_key)?;

        debug!(%group_id, "cached resource group key");
        self.groups.lock().await.insert(group_id.clone(), group);
        self.keys.lock().await.insert(group_id.clone(), key.clone());

        Ok(key)
    }

    /// Seeds the cache with a group this device just created, skipping the
    /// fetch-and-unwrap round trip.
    pub async fn insert(&self, group: ResourceGroupInfo, key: ContentKey) {
        let id = group.id.clone();
        self.groups.lock().await.insert(id.clone(), group);
        self.keys.lock().await.insert(id, key);
    }

    /// Returns cached group metadata, if any.
    pub async fn group(&self, group_id: &ResourceGroupId) -> Option<ResourceGroupInfo> {
        self.groups.lock().await.get(group_id).cloned()
    }

    /// Drops a cached group and key. Hook for a future key-rotation flow;
    /// nothing calls this today.
    pub async fn invalidate(&self, group_id: &ResourceGroupId) {
        self.keys.lock().await.remove(group_id);
        self.groups.lock().await.remove(group_id);
    }
}
