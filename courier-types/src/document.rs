//! The document model shared by the datastore and the sync engine.
//!
//! Every persisted record is a `Document`: an opaque id, a closed `kind`
//! tag, an optional parent (documents form a tree rooted at a workspace),
//! and a kind-specific JSON body the sync layer never interprets.

use crate::{DocumentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of document kinds the datastore holds.
///
/// Only the five request-modelling kinds participate in sync; responses and
/// usage stats stay local. Matching on this enum is exhaustive, so adding a
/// kind forces every dispatch site to decide whether it syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DocumentKind {
    Request,
    RequestGroup,
    Workspace,
    Environment,
    CookieJar,
    Response,
    Stats,
}

/// Document kinds that participate in sync, in promotion order.
pub const SYNCED_KINDS: [DocumentKind; 5] = [
    DocumentKind::Workspace,
    DocumentKind::RequestGroup,
    DocumentKind::Request,
    DocumentKind::Environment,
    DocumentKind::CookieJar,
];

impl DocumentKind {
    /// Whether documents of this kind are synced between devices.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        match self {
            Self::Request
            | Self::RequestGroup
            | Self::Workspace
            | Self::Environment
            | Self::CookieJar => true,
            Self::Response | Self::Stats => false,
        }
    }

    /// The id prefix used for locally minted documents of this kind.
    #[must_use]
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Request => "req",
            Self::RequestGroup => "fld",
            Self::Workspace => "wrk",
            Self::Environment => "env",
            Self::CookieJar => "jar",
            Self::Response => "res",
            Self::Stats => "sta",
        }
    }

    /// Stable string form used on the wire and in storage rows.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "Request",
            Self::RequestGroup => "RequestGroup",
            Self::Workspace => "Workspace",
            Self::Environment => "Environment",
            Self::CookieJar => "CookieJar",
            Self::Response => "Response",
            Self::Stats => "Stats",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for parsing an unrecognized kind tag.
#[derive(Debug, thiserror::Error)]
#[error("unknown document kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for DocumentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Request" => Ok(Self::Request),
            "RequestGroup" => Ok(Self::RequestGroup),
            "Workspace" => Ok(Self::Workspace),
            "Environment" => Ok(Self::Environment),
            "CookieJar" => Ok(Self::CookieJar),
            "Response" => Ok(Self::Response),
            "Stats" => Ok(Self::Stats),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque document id; equals the id of the Resource tracking it.
    pub id: DocumentId,
    /// Closed kind tag.
    pub kind: DocumentKind,
    /// Parent document, forming a tree rooted at a workspace.
    /// `None` for workspaces themselves.
    pub parent_id: Option<DocumentId>,
    /// Human-readable label, denormalized into the Resource row.
    pub name: String,
    /// Last local modification time.
    pub modified: Timestamp,
    /// Kind-specific payload. The sync layer treats this as opaque JSON.
    pub body: serde_json::Value,
}

impl Document {
    /// Creates a document with a freshly generated id.
    #[must_use]
    pub fn new(kind: DocumentKind, name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::generate(kind.id_prefix()),
            kind,
            parent_id: None,
            name: name.into(),
            modified: Timestamp::now(),
            body: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Sets the parent document id.
    #[must_use]
    pub fn with_parent(mut self, parent: &DocumentId) -> Self {
        self.parent_id = Some(parent.clone());
        self
    }

    /// Sets the kind-specific body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }
}

/// The kind of change a datastore write produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Remove,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("insert"),
            Self::Update => f.write_str("update"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// A change notification emitted by the datastore.
///
/// `from_sync` marks writes performed by the sync engine itself while
/// replaying remote state; the engine's own change listener skips those to
/// avoid re-queueing its own replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub document: Document,
    pub from_sync: bool,
}
