//! End-to-end tests for the JSON-file backed credential store.

use warden_protocol::AccountName;
use warden_store::{BootstrapSeed, CredentialStore, JsonFileStore, Profile, StoreError};

fn open(path: &std::path::Path) -> CredentialStore {
    CredentialStore::open(JsonFileStore::new(path)).expect("store should open")
}

#[test]
fn test_reopen_keeps_accounts_and_salts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let alice = AccountName::new("alice");

    let salt_before = {
        let store = open(&path);
        store.create(&alice, "wonderland").unwrap();
        store.record(&alice).unwrap().salt
    };

    let store = open(&path);
    assert!(store.verify(&alice, "wonderland"));
    assert_eq!(store.record(&alice).unwrap().salt, salt_before);
}

#[test]
fn test_document_uses_expected_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let store = open(&path);
    store.ensure_bootstrap_account(&BootstrapSeed::default()).unwrap();
    store.create(&AccountName::new("Bob"), "pw").unwrap();
    store
        .save_profile(
            &AccountName::new("bob"),
            Profile {
                last_location: Some("world;0;300;0".into()),
                ..Profile::default()
            },
        )
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();

    let admin = &raw["users"]["admin"];
    assert_eq!(admin["superuser"], true);
    assert_eq!(admin["salt"], "warden-bootstrap-7f3c2a91");
    let bob = &raw["users"]["bob"];
    assert_eq!(bob["superuser"], false);
    assert_eq!(bob["lastLocation"], "world;0;300;0");
    assert_eq!(bob["password"].as_str().unwrap().len(), 64);
}

#[test]
fn test_bootstrap_is_idempotent_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");

    assert!(open(&path).ensure_bootstrap_account(&BootstrapSeed::default()).unwrap());
    let store = open(&path);
    assert!(!store.ensure_bootstrap_account(&BootstrapSeed::default()).unwrap());
    assert_eq!(store.len(), 1);
    assert!(store.verify(&AccountName::superuser(), "changeme"));
}

#[test]
fn test_reads_hand_edited_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let salt = "abc";
    let hash = warden_store::hash_password("pw", salt);
    std::fs::write(
        &path,
        format!(r#"{{"users":{{"Carol":{{"password":"{hash}","salt":"{salt}","skinUrl":"http://s"}}}}}}"#),
    )
    .unwrap();

    let store = open(&path);
    let carol = AccountName::new("carol");

    assert!(store.verify(&carol, "pw"));
    assert!(!store.is_superuser(&carol));
    assert_eq!(
        store.load_profile(&carol).unwrap().appearance.as_deref(),
        Some("http://s")
    );
}

#[test]
fn test_corrupt_document_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(&path, "[]").unwrap();

    let result = CredentialStore::open(JsonFileStore::new(&path));

    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}
