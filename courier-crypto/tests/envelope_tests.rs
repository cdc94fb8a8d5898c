use courier_crypto::envelope::{unwrap_key, wrap_key};
use courier_crypto::{AccountKeyPair, ContentKey, WrappedKey};

#[test]
fn wrap_unwrap_roundtrip() {
    let account = AccountKeyPair::generate();
    let key = ContentKey::generate();

    let wrapped = wrap_key(&account.public_key(), &key).unwrap();
    let unwrapped = unwrap_key(account.secret_key(), &wrapped).unwrap();

    assert_eq!(unwrapped.as_bytes(), key.as_bytes());
}

#[test]
fn wrong_account_key_fails_unwrap() {
    let account = AccountKeyPair::generate();
    let other = AccountKeyPair::generate();
    let key = ContentKey::generate();

    let wrapped = wrap_key(&account.public_key(), &key).unwrap();
    assert!(unwrap_key(other.secret_key(), &wrapped).is_err());
}

#[test]
fn wrapping_twice_produces_different_envelopes() {
    // Fresh ephemeral key + nonce per wrap.
    let account = AccountKeyPair::generate();
    let key = ContentKey::generate();

    let w1 = wrap_key(&account.public_key(), &key).unwrap();
    let w2 = wrap_key(&account.public_key(), &key).unwrap();
    assert_ne!(w1, w2);
}

#[test]
fn garbage_envelope_is_rejected() {
    let account = AccountKeyPair::generate();
    assert!(unwrap_key(account.secret_key(), &WrappedKey::new("@@@")).is_err());
    assert!(unwrap_key(account.secret_key(), &WrappedKey::new("c2hvcnQ=")).is_err());
}

#[test]
fn key_pair_restores_from_secret_bytes() {
    let account = AccountKeyPair::generate();
    let restored = AccountKeyPair::from_secret_bytes(account.secret_bytes());
    assert_eq!(
        restored.public_key().as_bytes(),
        account.public_key().as_bytes()
    );

    let key = ContentKey::generate();
    let wrapped = wrap_key(&account.public_key(), &key).unwrap();
    let unwrapped = unwrap_key(restored.secret_key(), &wrapped).unwrap();
    assert_eq!(unwrapped.as_bytes(), key.as_bytes());
}
