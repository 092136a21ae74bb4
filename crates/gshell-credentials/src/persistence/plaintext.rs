//! Plaintext Store
//!
//! JSON document for development and inspection:
//!
//! ```json
//! { "schema_version": 2, "store": { "$kind": "CredentialStore", ... } }
//! ```
//!
//! Nothing here is encrypted. The file is still written owner-only.

use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

use super::codec;
use super::file::StoreFile;
use super::schema::{self, CURRENT_SCHEMA_VERSION};
use super::{CredentialPersistence, LoadedTree};
use crate::common::{CredentialError, CredentialResult};
use crate::model::CredentialTree;

/// Credential store kept as plain JSON
pub struct PlaintextStore {
    file: StoreFile,
}

impl PlaintextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: StoreFile::new(path),
        }
    }

    fn parse(data: &[u8]) -> Result<LoadedTree, String> {
        let doc: Value = serde_json::from_slice(data).map_err(|e| e.to_string())?;

        let version = doc
            .get("schema_version")
            .and_then(Value::as_u64)
            .ok_or("missing schema_version")?;
        let version = u16::try_from(version)
            .map_err(|_| format!("unsupported schema version {}", version))?;

        let store = doc.get("store").cloned().ok_or("missing store")?;
        let record = codec::from_json(store).map_err(|e| e.to_string())?;
        schema::decode_tree(record, version).map_err(|e| e.to_string())
    }
}

impl CredentialPersistence for PlaintextStore {
    fn load(&self) -> CredentialResult<Option<LoadedTree>> {
        let path = self.file.path();
        let Some(data) = self.file.read()? else {
            return Ok(None);
        };

        let loaded = Self::parse(&data).map_err(|reason| CredentialError::stale(path, reason))?;
        info!(
            "Loaded plaintext credential store from {:?} ({} domains)",
            path,
            loaded.tree.domains.len()
        );
        Ok(Some(loaded))
    }

    fn save(&self, tree: &CredentialTree) -> CredentialResult<()> {
        let record =
            codec::encode_tree(tree).map_err(|e| CredentialError::Encode(e.to_string()))?;
        let doc = json!({
            "schema_version": CURRENT_SCHEMA_VERSION,
            "store": codec::to_json(&record),
        });
        let mut bytes =
            serde_json::to_vec_pretty(&doc).map_err(|e| CredentialError::Encode(e.to_string()))?;
        bytes.push(b'\n');

        self.file.replace(&bytes)?;
        info!("Saved plaintext credential store to {:?}", self.file.path());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("plaintext store {}", self.file.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientSecrets, Domain, DomainUser, TokenInfo, TokenResponse};
    use crate::persistence::schema::downgrade_to_v1;

    fn tree() -> CredentialTree {
        let mut user = DomainUser::new("example.com", "alice");
        user.client_secrets = Some(ClientSecrets::new("alice-id", "alice-secret"));
        let mut domain = Domain::new("example.com").with_default_user("alice");
        domain.users.insert("alice".into(), user);

        let mut tree = CredentialTree::new();
        tree.default_domain = "example.com".into();
        tree.domains.insert("example.com".into(), domain);
        tree
    }

    #[test]
    fn test_roundtrip_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = PlaintextStore::new(&path);

        store.save(&tree()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.tree, tree());
        assert!(!loaded.should_save_again);

        let doc: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc["schema_version"], CURRENT_SCHEMA_VERSION);
        assert_eq!(doc["store"]["default_domain"], "example.com");
        let users = &doc["store"]["domains"]["entries"]["example.com"]["users"]["entries"];
        assert_eq!(users["alice"]["client_secrets"]["client_id"], "alice-id");
    }

    #[test]
    fn test_keys_named_like_the_kind_member_survive() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlaintextStore::new(dir.path().join("credentials.json"));

        let mut tree = tree();
        let alice = tree
            .domains
            .get_mut("example.com")
            .and_then(|d| d.users.get_mut("alice"))
            .unwrap();
        alice.tokens.insert(
            "$kind".into(),
            TokenInfo::new("raw", TokenResponse::new("tok"), vec![]),
        );
        tree.domains.insert("$kind".into(), Domain::new("$kind"));

        store.save(&tree).unwrap();
        assert_eq!(store.load().unwrap().unwrap().tree, tree);
    }

    #[test]
    fn test_second_session_does_not_erase_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let a = PlaintextStore::new(&path);
        let b = PlaintextStore::new(&path);
        a.load().unwrap();
        b.load().unwrap();

        let mut from_a = CredentialTree::new();
        from_a.domains.insert("a.com".into(), Domain::new("a.com"));
        a.save(&from_a).unwrap();

        let mut from_b = CredentialTree::new();
        from_b.domains.insert("b.com".into(), Domain::new("b.com"));
        let err = b.save(&from_b).unwrap_err();
        assert!(matches!(err, CredentialError::StoreChanged { .. }));

        let reopened = PlaintextStore::new(&path).load().unwrap().unwrap();
        assert!(reopened.tree.domains.contains_key("a.com"));
    }

    #[test]
    fn test_user_under_wrong_domain_is_refused_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let mut tree = tree();
        tree.domains
            .get_mut("example.com")
            .unwrap()
            .users
            .insert("bob".into(), DomainUser::new("other.com", "bob"));

        let err = PlaintextStore::new(&path).save(&tree).unwrap_err();
        assert!(matches!(err, CredentialError::Encode(ref msg) if msg.contains("bob")));
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_json_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = PlaintextStore::new(&path).load().unwrap_err();
        assert!(err.is_stale());
    }

    #[test]
    fn test_unknown_member_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = PlaintextStore::new(&path);
        store.save(&tree()).unwrap();

        let mut doc: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        doc["store"]["surprise"] = json!(true);
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let err = store.load().unwrap_err();
        assert!(err.is_stale());
        assert!(err.to_string().contains("surprise"));
    }

    #[test]
    fn test_v1_document_is_upgraded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let mut record = codec::encode(&tree());
        downgrade_to_v1(&mut record);
        let doc = json!({ "schema_version": 1, "store": codec::to_json(&record) });
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let loaded = PlaintextStore::new(&path).load().unwrap().unwrap();
        assert!(loaded.should_save_again);
        assert_eq!(loaded.tree, tree());
    }
}
