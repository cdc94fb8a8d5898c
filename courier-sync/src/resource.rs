//! Sync bookkeeping rows: resources and per-group configs.

use crate::protocol::ServerResource;
use courier_types::{AccountId, DocumentId, DocumentKind, ResourceGroupId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel version for a resource that has never been pushed.
pub const NO_VERSION: &str = "__NO_VERSION__";

/// The sync layer's wrapper around one document.
///
/// Exactly one resource exists per synced document id, and its
/// `resource_group_id` never changes after creation. Resources are never
/// hard-deleted while sync is active; removal is the `removed` tombstone
/// plus a dirty push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Equals the tracked document's id.
    pub id: DocumentId,
    /// Kind of the tracked document.
    pub kind: DocumentKind,
    /// The group whose key encrypts this resource's content.
    pub resource_group_id: ResourceGroupId,
    /// Opaque server-issued version token, or [`NO_VERSION`].
    pub version: String,
    /// Denormalized label, shown without decrypting.
    pub name: String,
    pub created_by: AccountId,
    pub last_edited: Timestamp,
    pub last_edited_by: AccountId,
    /// Tombstone flag.
    pub removed: bool,
    /// Base64 ciphertext of the JSON-serialized document.
    pub enc_content: String,
    /// True when local state has diverged from the last-known server
    /// version and must be pushed.
    pub dirty: bool,
}

impl Resource {
    /// Whether this resource has ever been pushed.
    #[must_use]
    pub fn has_version(&self) -> bool {
        self.version != NO_VERSION
    }

    /// Builds a local resource row from a server resource, e.g. when a pull
    /// discovers a document created on another device.
    #[must_use]
    pub fn from_server(server: &ServerResource, dirty: bool) -> Self {
        Self {
            id: server.id.clone(),
            kind: server.kind,
            resource_group_id: server.resource_group_id.clone(),
            version: server.version.clone(),
            name: server.name.clone(),
            created_by: server.created_by.clone(),
            last_edited: server.last_edited,
            last_edited_by: server.last_edited_by.clone(),
            removed: server.removed,
            enc_content: server.enc_content.clone(),
            dirty,
        }
    }
}

/// How a resource group participates in sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Excluded from full pulls; nothing moves without an explicit trigger.
    #[default]
    Off,
    /// Pulled/pushed only on explicit "sync now".
    Manual,
    /// Included in the periodic full pull.
    Automatic,
}

impl SyncMode {
    /// Stable string form used in storage rows.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }

    /// Whether groups in this mode join the periodic full pull.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            other => Err(format!("unknown sync mode: {other}")),
        }
    }
}

/// Per-group local sync preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub resource_group_id: ResourceGroupId,
    pub sync_mode: SyncMode,
}

impl Config {
    /// Creates a config with the default mode (off).
    #[must_use]
    pub fn new(resource_group_id: ResourceGroupId) -> Self {
        Self {
            resource_group_id,
            sync_mode: SyncMode::default(),
        }
    }
}
