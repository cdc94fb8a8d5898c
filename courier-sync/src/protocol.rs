//! Wire types for the push/pull sync protocol.
//!
//! The remote store speaks JSON with camelCase field names. Push sends the
//! full dirty resource rows; pull sends lightweight stubs plus a blacklist
//! of resource groups to leave untouched, and the server answers with the
//! four effect lists the engine applies in order.

use courier_crypto::WrappedKey;
use courier_types::{AccountId, DocumentId, DocumentKind, ResourceGroupId, Timestamp};
use serde::{Deserialize, Serialize};

/// A resource as it travels over the wire, in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResource {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub resource_group_id: ResourceGroupId,
    pub version: String,
    pub name: String,
    pub created_by: AccountId,
    pub last_edited: Timestamp,
    pub last_edited_by: AccountId,
    pub removed: bool,
    pub enc_content: String,
}

impl From<&crate::resource::Resource> for ServerResource {
    fn from(r: &crate::resource::Resource) -> Self {
        Self {
            id: r.id.clone(),
            kind: r.kind,
            resource_group_id: r.resource_group_id.clone(),
            version: r.version.clone(),
            name: r.name.clone(),
            created_by: r.created_by.clone(),
            last_edited: r.last_edited,
            last_edited_by: r.last_edited_by.clone(),
            removed: r.removed,
            enc_content: r.enc_content.clone(),
        }
    }
}

/// `(id, version)` pair acknowledging a pushed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRef {
    pub id: DocumentId,
    pub version: String,
}

/// Response body of `POST /sync/push`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    /// Resources the server accepted as updates.
    #[serde(default)]
    pub updated: Vec<VersionRef>,
    /// Resources the server saw for the first time.
    #[serde(default)]
    pub created: Vec<VersionRef>,
    /// Tombstones the server accepted.
    #[serde(default)]
    pub removed: Vec<VersionRef>,
    /// Resources whose server copy changed since our last-known version.
    /// Resolved client-side by last-write-wins.
    #[serde(default)]
    pub conflicts: Vec<ServerResource>,
}

/// One entry of a pull request's candidate set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStub {
    pub id: DocumentId,
    pub resource_group_id: ResourceGroupId,
    pub version: String,
    pub removed: bool,
}

/// Request body of `POST /sync/pull`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Everything we know locally.
    pub resources: Vec<ResourceStub>,
    /// Resource groups the server must not include in this pull.
    pub blacklist: Vec<ResourceGroupId>,
}

/// Response body of `POST /sync/pull`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Server-side edits to resources we already track.
    #[serde(default)]
    pub updated_resources: Vec<ServerResource>,
    /// Resources we have never seen.
    #[serde(default)]
    pub created_resources: Vec<ServerResource>,
    /// Ids the server wants re-sent (drift recovery).
    #[serde(default)]
    pub ids_to_push: Vec<DocumentId>,
    /// Ids deleted on the server side.
    #[serde(default)]
    pub ids_to_remove: Vec<DocumentId>,
}

/// Resource group metadata, including the wrapped symmetric key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupInfo {
    pub id: ResourceGroupId,
    pub name: String,
    /// The group's content key, sealed under the account public key.
    pub enc_symmetric_key: WrappedKey,
}

/// Request body of `POST /api/resource_groups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub enc_symmetric_key: WrappedKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_fields_are_camel_case() {
        let stub = ResourceStub {
            id: DocumentId::new("req_1"),
            resource_group_id: ResourceGroupId::new("rg_1"),
            version: "v1".into(),
            removed: false,
        };
        let json = serde_json::to_value(&stub).unwrap();
        assert!(json.get("resourceGroupId").is_some());
        assert!(json.get("resource_group_id").is_none());
    }

    #[test]
    fn pull_response_defaults_missing_lists() {
        let resp: PullResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.updated_resources.is_empty());
        assert!(resp.ids_to_push.is_empty());
    }
}
