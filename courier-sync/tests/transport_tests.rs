use courier_crypto::AccountKeyPair;
use courier_sync::{
    Account, CreateGroupRequest, HttpTransport, PullRequest, RemoteTransport, ResourceStub,
    Session, SyncError,
};
use courier_types::{AccountId, DocumentId, ResourceGroupId};
use courier_crypto::WrappedKey;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn logged_in_session() -> Arc<Session> {
    let session = Arc::new(Session::new());
    session.log_in(
        Account {
            id: AccountId::new("acct_tester"),
            email: "tester@courier.dev".to_string(),
        },
        AccountKeyPair::generate(),
        "token-123",
    );
    session
}

fn pull_request() -> PullRequest {
    PullRequest {
        resources: vec![ResourceStub {
            id: DocumentId::new("req_1"),
            resource_group_id: ResourceGroupId::new("rg_1"),
            version: "v1".to_string(),
            removed: false,
        }],
        blacklist: vec![ResourceGroupId::new("rg_off")],
    }
}

#[tokio::test]
async fn push_sends_bearer_token_and_parses_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync/push"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "updated": [{"id": "req_1", "version": "v2"}],
            "created": [],
            "removed": [],
            "conflicts": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), logged_in_session());
    let response = transport.push(&[]).await.unwrap();

    assert_eq!(response.updated.len(), 1);
    assert_eq!(response.updated[0].version, "v2");
}

#[tokio::test]
async fn pull_body_uses_camel_case_wire_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync/pull"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "updatedResources": [],
            "createdResources": [],
            "idsToPush": ["req_9"],
            "idsToRemove": []
        })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), logged_in_session());
    let response = transport.pull(&pull_request()).await.unwrap();
    assert_eq!(response.ids_to_push, vec![DocumentId::new("req_9")]);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["resources"][0]["resourceGroupId"], "rg_1");
    assert_eq!(body["blacklist"][0], "rg_off");
}

#[tokio::test]
async fn non_2xx_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync/pull"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), logged_in_session());
    let err = transport.pull(&pull_request()).await.unwrap_err();

    match err {
        SyncError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_resource_group_hits_the_id_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource_groups/rg_1"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "rg_1",
            "name": "Team workspace",
            "encSymmetricKey": "d3JhcHBlZA=="
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), logged_in_session());
    let group = transport
        .fetch_resource_group(&ResourceGroupId::new("rg_1"))
        .await
        .unwrap();

    assert_eq!(group.id, ResourceGroupId::new("rg_1"));
    assert_eq!(group.enc_symmetric_key, WrappedKey::new("d3JhcHBlZA=="));
}

#[tokio::test]
async fn create_resource_group_posts_the_wrapped_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resource_groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "rg_new",
            "name": "My workspace",
            "encSymmetricKey": "d3JhcHBlZA=="
        })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), logged_in_session());
    let group = transport
        .create_resource_group(&CreateGroupRequest {
            name: "My workspace".to_string(),
            enc_symmetric_key: WrappedKey::new("d3JhcHBlZA=="),
        })
        .await
        .unwrap();
    assert_eq!(group.id, ResourceGroupId::new("rg_new"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["encSymmetricKey"], "d3JhcHBlZA==");
}

#[tokio::test]
async fn reset_posts_to_auth_reset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), logged_in_session());
    transport.reset_sync_data().await.unwrap();
}

#[tokio::test]
async fn logged_out_session_never_reaches_the_network() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new(server.uri(), Arc::new(Session::new()));

    assert!(matches!(
        transport.push(&[]).await,
        Err(SyncError::NotLoggedIn)
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}
