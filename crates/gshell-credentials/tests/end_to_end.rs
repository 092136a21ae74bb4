//! Sessions over real on-disk stores, re-opened the way separate gShell
//! invocations would.

use gshell_credentials::crypto::{AccountIdentity, AccountKey};
use gshell_credentials::persistence::{copy_tree, CURRENT_SCHEMA_VERSION};
use gshell_credentials::{
    Backend, ClientSecrets, CredentialConsumer, CredentialError, CredentialPersistence, Domain,
    DomainUser, EncryptedStore, PlaintextStore, StoreConfig, TokenResponse,
};
use serde_json::{json, Value};

fn account_key() -> AccountKey {
    AccountKey::derive(&AccountIdentity {
        machine_id: "0f3c9a-test-machine".into(),
        account: "alice".into(),
    })
    .unwrap()
}

fn populate(c: &mut CredentialConsumer) {
    c.set_default_client_secrets(ClientSecrets::new("id1", "s1"))
        .unwrap();
    c.set_domain(Domain::new("example.com")).unwrap();
    c.set_default_domain("example.com").unwrap();
    c.set_user("example.com", DomainUser::new("example.com", "alice"))
        .unwrap();
    c.set_default_user("example.com", "alice").unwrap();
    c.set_token_and_scopes(
        "example.com",
        "alice",
        "admin:directory_v1",
        "{\"access_token\":\"tok1\"}",
        TokenResponse::new("tok1")
            .with_refresh_token("1//refresh")
            .with_scope("scopeA")
            .with_expires_in(3599),
        vec!["scopeA".into()],
    )
    .unwrap();
}

#[test]
fn test_encrypted_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.bin");

    let mut first =
        CredentialConsumer::new(Box::new(EncryptedStore::with_key(&path, account_key()))).unwrap();
    populate(&mut first);
    let expected = first.tree().clone();
    drop(first);

    let second =
        CredentialConsumer::new(Box::new(EncryptedStore::with_key(&path, account_key()))).unwrap();
    assert_eq!(second.tree(), &expected);

    let target = second.resolve_target(None, None).unwrap();
    assert_eq!((target.domain.as_str(), target.user.as_str()), ("example.com", "alice"));
    let info = second
        .get_token_info(&target.domain, &target.user, "admin:directory_v1")
        .unwrap();
    assert_eq!(info.token.access_token, "tok1");
    assert_eq!(info.token.refresh_token.as_deref(), Some("1//refresh"));
}

#[test]
fn test_other_account_cannot_read_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.bin");

    let mut c =
        CredentialConsumer::new(Box::new(EncryptedStore::with_key(&path, account_key()))).unwrap();
    populate(&mut c);
    drop(c);

    let bob = AccountKey::derive(&AccountIdentity {
        machine_id: "0f3c9a-test-machine".into(),
        account: "bob".into(),
    })
    .unwrap();
    let err = CredentialConsumer::new(Box::new(EncryptedStore::with_key(&path, bob))).unwrap_err();
    assert!(err.is_stale());
    assert!(err.to_string().contains("re-authenticate"));
}

#[test]
fn test_plaintext_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(Backend::Plaintext, dir.path().join("credentials.json"));

    let mut first = CredentialConsumer::open(&config).unwrap();
    populate(&mut first);
    let expected = first.tree().clone();
    drop(first);

    let second = CredentialConsumer::open(&config).unwrap();
    assert_eq!(second.tree(), &expected);
}

#[test]
fn test_v1_plaintext_store_is_rewritten_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    let v1 = json!({
        "schema_version": 1,
        "store": {
            "$kind": "CredentialStore",
            "default_domain": "example.com",
            "default_client_secrets": null,
            "domains": { "$kind": "Map", "entries": {
                "example.com": {
                    "$kind": "Domain",
                    "name": "example.com",
                    "default_user": "alice",
                    "users": { "$kind": "Map", "entries": {
                        "alice": {
                            "$kind": "DomainUser",
                            "domain": "example.com",
                            "user_name": "alice",
                            "client_secrets": null,
                            "tokens": { "$kind": "Map", "entries": {
                                "gmail:v1": {
                                    "$kind": "TokenInfo",
                                    "token_string": "raw",
                                    "token": {
                                        "$kind": "TokenResponse",
                                        "access_token": "tok1",
                                        "refresh_token": null,
                                        "token_type": "Bearer",
                                        "scope": "scopeA scopeB",
                                        "expires_in_seconds": 3600,
                                        "issued": 1700000000
                                    }
                                }
                            }}
                        }
                    }}
                }
            }}
        }
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&v1).unwrap()).unwrap();

    let c = CredentialConsumer::new(Box::new(PlaintextStore::new(&path))).unwrap();
    let info = c.get_token_info("example.com", "alice", "gmail:v1").unwrap();
    assert_eq!(info.scopes, vec!["scopeA", "scopeB"]);
    assert_eq!(info.token.issued_utc.timestamp(), 1_700_000_000);

    let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["schema_version"], CURRENT_SCHEMA_VERSION);
    let alice = &on_disk["store"]["domains"]["entries"]["example.com"]["users"]["entries"]["alice"];
    let token = &alice["tokens"]["entries"]["gmail:v1"];
    assert!(token["token"].get("issued").is_none());
    assert!(token["token"]["issued_utc"].is_string());
}

#[test]
fn test_migrate_encrypted_to_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let encrypted = EncryptedStore::with_key(dir.path().join("credentials.bin"), account_key());
    let plaintext = PlaintextStore::new(dir.path().join("credentials.json"));

    let mut c = CredentialConsumer::new(Box::new(EncryptedStore::with_key(
        dir.path().join("credentials.bin"),
        account_key(),
    )))
    .unwrap();
    populate(&mut c);

    assert!(copy_tree(&encrypted, &plaintext).unwrap());
    assert_eq!(&plaintext.load().unwrap().unwrap().tree, c.tree());
}

#[test]
fn test_concurrent_sessions_do_not_lose_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(Backend::Plaintext, dir.path().join("credentials.json"));

    let mut a = CredentialConsumer::open(&config).unwrap();
    let mut b = CredentialConsumer::open(&config).unwrap();
    a.set_domain(Domain::new("a.com")).unwrap();

    let err = b.set_domain(Domain::new("b.com")).unwrap_err();
    assert!(matches!(err, CredentialError::StoreChanged { .. }));
    assert!(!b.domain_exists("b.com"));
    drop(b);

    // a fresh session sees the first writer and can add its own change
    let mut b = CredentialConsumer::open(&config).unwrap();
    assert!(b.domain_exists("a.com"));
    b.set_domain(Domain::new("b.com")).unwrap();

    let reopened = CredentialConsumer::open(&config).unwrap();
    assert!(reopened.domain_exists("a.com"));
    assert!(reopened.domain_exists("b.com"));
}
