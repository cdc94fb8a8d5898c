use courier_crypto::cipher::{decrypt, decrypt_string, encrypt, encrypt_string};
use courier_crypto::{ContentKey, EncryptedData};

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = ContentKey::generate();
    let plaintext = b"Hello, World!";
    let encrypted = encrypt(&key, plaintext).unwrap();
    let decrypted = decrypt(&key, &encrypted).unwrap();
    assert_eq!(decrypted, plaintext);
}

#[test]
fn encrypt_decrypt_empty() {
    let key = ContentKey::generate();
    let encrypted = encrypt(&key, b"").unwrap();
    let decrypted = decrypt(&key, &encrypted).unwrap();
    assert_eq!(decrypted, b"");
}

#[test]
fn wrong_key_fails_decryption() {
    let key1 = ContentKey::generate();
    let key2 = ContentKey::generate();
    let encrypted = encrypt(&key1, b"Secret").unwrap();
    assert!(decrypt(&key2, &encrypted).is_err());
}

#[test]
fn tampered_data_fails_decryption() {
    let key = ContentKey::generate();
    let mut encrypted = encrypt(&key, b"Secret").unwrap();
    if !encrypted.ciphertext.is_empty() {
        encrypted.ciphertext[0] ^= 0xFF;
    }
    assert!(decrypt(&key, &encrypted).is_err());
}

#[test]
fn same_plaintext_produces_different_ciphertext() {
    let key = ContentKey::generate();
    let e1 = encrypt(&key, b"Same").unwrap();
    let e2 = encrypt(&key, b"Same").unwrap();
    assert_ne!(e1.nonce, e2.nonce);
    assert_ne!(e1.ciphertext, e2.ciphertext);
}

// ── Base64 transport form ────────────────────────────────────────

#[test]
fn string_roundtrip_through_base64() {
    let key = ContentKey::generate();
    let doc = r#"{"id":"req_1","name":"Get users","method":"GET"}"#;
    let encoded = encrypt_string(&key, doc).unwrap();
    let decoded = decrypt_string(&key, &encoded).unwrap();
    assert_eq!(decoded, doc);
}

#[test]
fn base64_roundtrip_preserves_nonce_and_ciphertext() {
    let key = ContentKey::generate();
    let encrypted = encrypt(&key, b"payload").unwrap();
    let parsed = EncryptedData::from_base64(&encrypted.to_base64()).unwrap();
    assert_eq!(parsed.nonce, encrypted.nonce);
    assert_eq!(parsed.ciphertext, encrypted.ciphertext);
}

#[test]
fn invalid_base64_is_rejected() {
    assert!(EncryptedData::from_base64("not base64 !!!").is_err());
}

#[test]
fn truncated_data_is_rejected() {
    // Shorter than nonce + tag can never be valid.
    use base64::{Engine, engine::general_purpose::STANDARD};
    let short = STANDARD.encode([0u8; 8]);
    assert!(EncryptedData::from_base64(&short).is_err());
}
