//! Account session state.
//!
//! Holds the logged-in account's identity, X25519 key pair, and session
//! token. Every sync operation checks [`Session::is_logged_in`] first and
//! degrades to a logged no-op when there is no session; the accessors here
//! return `SyncResult` so deeper code paths that genuinely require key
//! material fail with [`SyncError::NotLoggedIn`] instead of panicking.

use crate::error::{SyncError, SyncResult};
use courier_crypto::{AccountKeyPair, PublicKey, SecretKey};
use courier_types::AccountId;
use std::sync::RwLock;

/// The logged-in account's identity.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
}

#[derive(Debug, Clone)]
struct LoginState {
    account: Account,
    keys: AccountKeyPair,
    token: String,
}

/// Process-wide session holder. Cheap to share (`Arc<Session>`); all
/// accessors take `&self`.
#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<Option<LoginState>>,
}

impl Session {
    /// Creates a logged-out session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a login: account identity, key pair, and session token.
    pub fn log_in(&self, account: Account, keys: AccountKeyPair, token: impl Into<String>) {
        *self.state.write().unwrap() = Some(LoginState {
            account,
            keys,
            token: token.into(),
        });
    }

    /// Clears the session.
    pub fn log_out(&self) {
        *self.state.write().unwrap() = None;
    }

    /// Whether an account is currently logged in.
    pub fn is_logged_in(&self) -> bool {
        self.state.read().unwrap().is_some()
    }

    /// The logged-in account id.
    pub fn account_id(&self) -> SyncResult<AccountId> {
        self.state
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.account.id.clone())
            .ok_or(SyncError::NotLoggedIn)
    }

    /// The account's public key (for wrapping new group keys).
    pub fn public_key(&self) -> SyncResult<PublicKey> {
        self.state
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.keys.public_key())
            .ok_or(SyncError::NotLoggedIn)
    }

    /// The account's secret key (for unwrapping group keys).
    pub fn secret_key(&self) -> SyncResult<SecretKey> {
        self.state
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.keys.secret_key().clone())
            .ok_or(SyncError::NotLoggedIn)
    }

    /// The bearer token for authenticated transport calls.
    pub fn token(&self) -> SyncResult<String> {
        self.state
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(SyncError::NotLoggedIn)
    }
}
