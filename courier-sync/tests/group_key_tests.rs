use courier_crypto::{AccountKeyPair, ContentKey, envelope};
use courier_sync::transport::mock::MockTransport;
use courier_sync::{
    Account, GroupKeyCache, ResourceGroupInfo, ResourceStore, Session, SyncError, SyncMode,
};
use courier_types::{AccountId, ResourceGroupId};
use std::sync::Arc;

struct Harness {
    cache: GroupKeyCache,
    transport: Arc<MockTransport>,
    resources: Arc<ResourceStore>,
    session: Arc<Session>,
}

fn harness() -> Harness {
    let session = Arc::new(Session::new());
    session.log_in(
        Account {
            id: AccountId::new("acct_tester"),
            email: "tester@courier.dev".to_string(),
        },
        AccountKeyPair::generate(),
        "token-123",
    );

    let transport = Arc::new(MockTransport::new());
    let resources = Arc::new(ResourceStore::open_in_memory().unwrap());
    let cache = GroupKeyCache::new(transport.clone(), session.clone(), resources.clone());

    Harness {
        cache,
        transport,
        resources,
        session,
    }
}

/// Scripts a fetchable group whose key is wrapped for the harness session.
fn script_group(h: &Harness, id: &ResourceGroupId) -> ContentKey {
    let key = ContentKey::generate();
    let wrapped = envelope::wrap_key(&h.session.public_key().unwrap(), &key).unwrap();
    h.transport.script_group_fetch(Ok(ResourceGroupInfo {
        id: id.clone(),
        name: "Team workspace".to_string(),
        enc_symmetric_key: wrapped,
    }));
    key
}

#[tokio::test]
async fn key_is_fetched_once_and_memoized() {
    let h = harness();
    let group = ResourceGroupId::new("rg_1");
    let key = script_group(&h, &group);

    let first = h.cache.symmetric_key(&group).await.unwrap();
    let second = h.cache.symmetric_key(&group).await.unwrap();

    assert_eq!(first.as_bytes(), key.as_bytes());
    assert_eq!(second.as_bytes(), key.as_bytes());
    assert_eq!(h.transport.group_fetches().len(), 1);
}

#[tokio::test]
async fn concurrent_requests_collapse_into_one_fetch() {
    let h = harness();
    let group = ResourceGroupId::new("rg_1");
    script_group(&h, &group);

    let (a, b) = tokio::join!(
        h.cache.symmetric_key(&group),
        h.cache.symmetric_key(&group)
    );

    assert_eq!(a.unwrap().as_bytes(), b.unwrap().as_bytes());
    assert_eq!(h.transport.group_fetches().len(), 1);
}

#[tokio::test]
async fn failed_fetch_is_not_poisoned() {
    let h = harness();
    let group = ResourceGroupId::new("rg_1");

    h.transport.script_group_fetch(Err(SyncError::Network("connection refused".into())));
    assert!(h.cache.symmetric_key(&group).await.is_err());

    let key = script_group(&h, &group);
    let fetched = h.cache.symmetric_key(&group).await.unwrap();
    assert_eq!(fetched.as_bytes(), key.as_bytes());
    assert_eq!(h.transport.group_fetches().len(), 2);
}

#[tokio::test]
async fn first_fetch_creates_default_config() {
    let h = harness();
    let group = ResourceGroupId::new("rg_1");
    script_group(&h, &group);

    assert!(h.resources.get_config(&group).unwrap().is_none());
    h.cache.symmetric_key(&group).await.unwrap();

    let config = h.resources.get_config(&group).unwrap().unwrap();
    assert_eq!(config.sync_mode, SyncMode::Off);
}

#[tokio::test]
async fn seeded_groups_skip_the_fetch() {
    let h = harness();
    let group = ResourceGroupId::new("rg_1");
    let key = ContentKey::generate();
    let wrapped = envelope::wrap_key(&h.session.public_key().unwrap(), &key).unwrap();

    h.cache
        .insert(
            ResourceGroupInfo {
                id: group.clone(),
                name: "Local workspace".to_string(),
                enc_symmetric_key: wrapped,
            },
            key.clone(),
        )
        .await;

    let fetched = h.cache.symmetric_key(&group).await.unwrap();
    assert_eq!(fetched.as_bytes(), key.as_bytes());
    assert!(h.transport.group_fetches().is_empty());
    assert!(h.cache.group(&group).await.is_some());
}

#[tokio::test]
async fn invalidate_forces_a_refetch() {
    let h = harness();
    let group = ResourceGroupId::new("rg_1");
    script_group(&h, &group);
    h.cache.symmetric_key(&group).await.unwrap();

    h.cache.invalidate(&group).await;
    assert!(h.cache.group(&group).await.is_none());

    script_group(&h, &group);
    h.cache.symmetric_key(&group).await.unwrap();
    assert_eq!(h.transport.group_fetches().len(), 2);
}

#[tokio::test]
async fn unwrap_with_wrong_account_key_fails() {
    let h = harness();
    let group = ResourceGroupId::new("rg_1");

    // Wrapped for some other account's key pair.
    let other = AccountKeyPair::generate();
    let key = ContentKey::generate();
    let wrapped = envelope::wrap_key(&other.public_key(), &key).unwrap();
    h.transport.script_group_fetch(Ok(ResourceGroupInfo {
        id: group.clone(),
        name: "Foreign".to_string(),
        enc_symmetric_key: wrapped,
    }));

    assert!(matches!(
        h.cache.symmetric_key(&group).await,
        Err(SyncError::Crypto(_))
    ));
}
