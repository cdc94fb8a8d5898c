//! Remote transport abstraction.
//!
//! The engine talks to the remote store through [`RemoteTransport`], so
//! tests can script server behavior and the HTTP layer stays in one place.
//! [`HttpTransport`] is the production implementation: JSON over HTTPS,
//! bearer-token auth from the session.

use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    CreateGroupRequest, PullRequest, PullResponse, PushResponse, ResourceGroupInfo, ServerResource,
};
use crate::session::Session;
use async_trait::async_trait;
use courier_types::ResourceGroupId;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Authenticated calls against the remote sync store.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// `POST /sync/push` with the full dirty resource rows.
    async fn push(&self, resources: &[ServerResource]) -> SyncResult<PushResponse>;

    /// `POST /sync/pull` with the candidate stubs and group blacklist.
    async fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse>;

    /// `GET /api/resource_groups/:id`.
    async fn fetch_resource_group(&self, id: &ResourceGroupId) -> SyncResult<ResourceGroupInfo>;

    /// `POST /api/resource_groups`; the body carries the wrapped key.
    async fn create_resource_group(
        &self,
        request: &CreateGroupRequest,
    ) -> SyncResult<ResourceGroupInfo>;

    /// `POST /auth/reset` — wipes the account's remote sync data.
    async fn reset_sync_data(&self) -> SyncResult<()>;

    /// `POST /auth/cancel-account`.
    async fn cancel_account(&self) -> SyncResult<()>;
}

/// Production HTTP transport.
pub struct HttpTransport {
    base_url: String,
    client: Client,
    session: Arc<Session>,
}

impl HttpTransport {
    /// Creates a transport against the given API base URL.
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create HTTP client");

        Self {
            base_url: base_url.into(),
            client,
            session,
        }
    }

    async fn post_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncResult<T> {
        let token = self.session.token()?;
        debug!(path, "sync api call");

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("failed to parse {path} response: {e}")))
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn push(&self, resources: &[ServerResource]) -> SyncResult<PushResponse> {
        self.post_json("/sync/push", resources).await
    }

    async fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        self.post_json("/sync/pull", request).await
    }

    async fn fetch_resource_group(&self, id: &ResourceGroupId) -> SyncResult<ResourceGroupInfo> {
        let token = self.session.token()?;
        let path = format!("/api/resource_groups/{}", urlencoding::encode(id.as_str()));

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("failed to parse {path} response: {e}")))
    }

    async fn create_resource_group(
        &self,
        request: &CreateGroupRequest,
    ) -> SyncResult<ResourceGroupInfo> {
        self.post_json("/api/resource_groups", request).await
    }

    async fn reset_sync_data(&self) -> SyncResult<()> {
        let _: serde_json::Value = self.post_json("/auth/reset", &serde_json::json!({})).await?;
        Ok(())
    }

    async fn cancel_account(&self) -> SyncResult<()> {
        let _: serde_json::Value = self
            .post_json("/auth/cancel-account", &serde_json::json!({}))
            .await?;
        Ok(())
    }
}

/// A scripted transport for testing.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records engine calls and answers them from scripted queues.
    ///
    /// Unscripted push/pull calls answer with an empty response; an
    /// unscripted group fetch answers 404. Push an `Err` to simulate a
    /// network failure.
    #[derive(Default)]
    pub struct MockTransport {
        push_responses: Mutex<VecDeque<SyncResult<PushResponse>>>,
        pull_responses: Mutex<VecDeque<SyncResult<PullResponse>>>,
        group_responses: Mutex<VecDeque<SyncResult<ResourceGroupInfo>>>,
        pushed: Mutex<Vec<Vec<ServerResource>>>,
        pulled: Mutex<Vec<PullRequest>>,
        group_fetches: Mutex<Vec<ResourceGroupId>>,
        groups_created: Mutex<Vec<CreateGroupRequest>>,
        resets: Mutex<usize>,
        cancels: Mutex<usize>,
    }

    impl MockTransport {
        /// Creates a mock with empty scripts.
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues the answer for the next push call.
        pub fn script_push(&self, response: SyncResult<PushResponse>) {
            self.push_responses.lock().unwrap().push_back(response);
        }

        /// Queues the answer for the next pull call.
        pub fn script_pull(&self, response: SyncResult<PullResponse>) {
            self.pull_responses.lock().unwrap().push_back(response);
        }

        /// Queues the answer for the next group fetch.
        pub fn script_group_fetch(&self, response: SyncResult<ResourceGroupInfo>) {
            self.group_responses.lock().unwrap().push_back(response);
        }

        /// Bodies of every push call, in order.
        pub fn pushed(&self) -> Vec<Vec<ServerResource>> {
            self.pushed.lock().unwrap().clone()
        }

        /// Bodies of every pull call, in order.
        pub fn pulled(&self) -> Vec<PullRequest> {
            self.pulled.lock().unwrap().clone()
        }

        /// Ids of every group fetch, in order.
        pub fn group_fetches(&self) -> Vec<ResourceGroupId> {
            self.group_fetches.lock().unwrap().clone()
        }

        /// Bodies of every group creation, in order.
        pub fn groups_created(&self) -> Vec<CreateGroupRequest> {
            self.groups_created.lock().unwrap().clone()
        }

        /// Number of `reset_sync_data` calls.
        pub fn reset_count(&self) -> usize {
            *self.resets.lock().unwrap()
        }

        /// Number of `cancel_account` calls.
        pub fn cancel_count(&self) -> usize {
            *self.cancels.lock().unwrap()
        }
    }

    #[async_trait]
    impl RemoteTransport for MockTransport {
        async fn push(&self, resources: &[ServerResource]) -> SyncResult<PushResponse> {
            self.pushed.lock().unwrap().push(resources.to_vec());
            self.push_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PushResponse::default()))
        }

        async fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
            self.pulled.lock().unwrap().push(request.clone());
            self.pull_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PullResponse::default()))
        }

        async fn fetch_resource_group(
            &self,
            id: &ResourceGroupId,
        ) -> SyncResult<ResourceGroupInfo> {
            self.group_fetches.lock().unwrap().push(id.clone());
            self.group_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(SyncError::Api {
                        status: 404,
                        message: format!("no such resource group: {id}"),
                    })
                })
        }

        async fn create_resource_group(
            &self,
            request: &CreateGroupRequest,
        ) -> SyncResult<ResourceGroupInfo> {
            self.groups_created.lock().unwrap().push(request.clone());
            Ok(ResourceGroupInfo {
                id: ResourceGroupId::generate("rg"),
                name: request.name.clone(),
                enc_symmetric_key: request.enc_symmetric_key.clone(),
            })
        }

        async fn reset_sync_data(&self) -> SyncResult<()> {
            *self.resets.lock().unwrap() += 1;
            Ok(())
        }

        async fn cancel_account(&self) -> SyncResult<()> {
            *self.cancels.lock().unwrap() += 1;
            Ok(())
        }
    }
}
