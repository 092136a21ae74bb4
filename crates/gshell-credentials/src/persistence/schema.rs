//! Schema Versions
//!
//! Every persisted document carries an explicit schema version. Documents in
//! an older shape are upgraded by one migration per version step, applied
//! once on load; the resulting tree is flagged so the consumer re-persists it
//! in the current shape.
//!
//! | version | shape                                                          |
//! |---------|----------------------------------------------------------------|
//! | 1       | token entries without `scopes`; `TokenResponse.issued` in Unix seconds |
//! | 2       | `TokenInfo.scopes`; `TokenResponse.issued_utc` as RFC 3339       |

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::codec::{self, CodecError, FieldValue, Record};
use super::LoadedTree;
use crate::model::CredentialTree;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u16 = 2;
/// Oldest schema version this build can upgrade
pub const OLDEST_SCHEMA_VERSION: u16 = 1;

type Migration = fn(&mut Record) -> Result<(), CodecError>;

/// `(from, migration to from + 1)`
const MIGRATIONS: &[(u16, Migration)] = &[(1, migrate_v1_to_v2)];

/// Upgrade `record` from `version` to the current schema.
/// Returns whether any migration ran.
pub fn upgrade(record: &mut Record, version: u16) -> Result<bool, CodecError> {
    if !(OLDEST_SCHEMA_VERSION..=CURRENT_SCHEMA_VERSION).contains(&version) {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            oldest: OLDEST_SCHEMA_VERSION,
            current: CURRENT_SCHEMA_VERSION,
        });
    }

    let mut current = version;
    while current < CURRENT_SCHEMA_VERSION {
        let (_, migrate) = MIGRATIONS
            .iter()
            .find(|(from, _)| *from == current)
            .ok_or(CodecError::UnsupportedVersion {
                found: current,
                oldest: OLDEST_SCHEMA_VERSION,
                current: CURRENT_SCHEMA_VERSION,
            })?;
        migrate(record)?;
        debug!(from = current, to = current + 1, "Migrated credential store schema");
        current += 1;
    }

    if version != CURRENT_SCHEMA_VERSION {
        info!(
            "Upgraded credential store from schema v{} to v{}",
            version, CURRENT_SCHEMA_VERSION
        );
    }
    Ok(version != CURRENT_SCHEMA_VERSION)
}

/// Upgrade and decode a root record read at `version`.
pub fn decode_tree(mut record: Record, version: u16) -> Result<LoadedTree, CodecError> {
    let migrated = upgrade(&mut record, version)?;
    let tree: CredentialTree = codec::decode(record)?;
    Ok(LoadedTree {
        tree,
        should_save_again: migrated,
    })
}

// ── Migrations ──────────────────────────────────────────────────────────────

fn entries<'a>(
    record: &'a mut Record,
    name: &str,
) -> Result<impl Iterator<Item = &'a mut Record> + 'a, CodecError> {
    let kind = record.kind().to_string();
    record
        .map_entries_mut(name)
        .ok_or_else(|| CodecError::MissingField {
            kind,
            field: name.to_string(),
        })
}

fn migrate_v1_to_v2(root: &mut Record) -> Result<(), CodecError> {
    for domain in entries(root, "domains")? {
        for user in entries(domain, "users")? {
            for info in entries(user, "tokens")? {
                token_info_v1_to_v2(info)?;
            }
        }
    }
    Ok(())
}

fn token_info_v1_to_v2(info: &mut Record) -> Result<(), CodecError> {
    let kind = info.kind().to_string();
    let Some(FieldValue::Record(token)) = info.get_mut("token") else {
        return Err(CodecError::MissingField {
            kind,
            field: "token".into(),
        });
    };

    if let Some(issued) = token.remove("issued") {
        let FieldValue::Int(secs) = issued else {
            return Err(CodecError::InvalidValue {
                kind: token.kind().to_string(),
                field: "issued".into(),
                reason: "expected Unix seconds".into(),
            });
        };
        let issued_utc = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
            CodecError::InvalidValue {
                kind: token.kind().to_string(),
                field: "issued".into(),
                reason: format!("{} is out of range", secs),
            }
        })?;
        token.insert("issued_utc", FieldValue::Text(issued_utc.to_rfc3339()));
    }

    // v1 only kept the space-separated grant on the token itself
    let scopes = match token.get("scope") {
        Some(FieldValue::Text(scope)) => scope
            .split_whitespace()
            .map(|s| FieldValue::Text(s.to_string()))
            .collect(),
        _ => Vec::new(),
    };
    if !info.contains("scopes") {
        info.insert("scopes", FieldValue::List(scopes));
    }
    Ok(())
}

/// Rewrite a current root record into the v1 shape.
#[cfg(test)]
pub(crate) fn downgrade_to_v1(root: &mut Record) {
    for domain in entries(root, "domains").unwrap() {
        for user in entries(domain, "users").unwrap() {
            for info in entries(user, "tokens").unwrap() {
                info.remove("scopes");
                if let Some(FieldValue::Record(token)) = info.get_mut("token") {
                    if let Some(FieldValue::Text(raw)) = token.remove("issued_utc") {
                        let secs = DateTime::parse_from_rfc3339(&raw).unwrap().timestamp();
                        token.insert("issued", FieldValue::Int(secs));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, DomainUser, TokenInfo, TokenResponse};
    use chrono::TimeZone;

    fn tree_with_token(scopes: Vec<String>) -> CredentialTree {
        let token = TokenResponse::new("tok1")
            .with_scope("https://a.example/scope1 https://a.example/scope2")
            .issued_at(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap());
        let mut user = DomainUser::new("example.com", "alice");
        user.tokens
            .insert("admin:directory_v1".into(), TokenInfo::new("raw", token, scopes));
        let mut domain = Domain::new("example.com");
        domain.users.insert("alice".into(), user);
        let mut tree = CredentialTree::new();
        tree.domains.insert("example.com".into(), domain);
        tree
    }

    #[test]
    fn test_current_version_is_not_migrated() {
        let tree = tree_with_token(vec!["x".into()]);
        let loaded = decode_tree(codec::encode(&tree), CURRENT_SCHEMA_VERSION).unwrap();
        assert!(!loaded.should_save_again);
        assert_eq!(loaded.tree, tree);
    }

    #[test]
    fn test_v1_upgrades_and_derives_scopes() {
        let tree = tree_with_token(vec![]);
        let mut record = codec::encode(&tree);
        downgrade_to_v1(&mut record);

        // a v1 document does not decode as v2
        assert!(codec::decode::<CredentialTree>(record.clone()).is_err());

        let loaded = decode_tree(record, 1).unwrap();
        assert!(loaded.should_save_again);

        let info = &loaded.tree.domains["example.com"].users["alice"].tokens["admin:directory_v1"];
        assert_eq!(
            info.scopes,
            vec!["https://a.example/scope1", "https://a.example/scope2"]
        );
        assert_eq!(
            info.token.issued_utc,
            Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn test_unknown_versions_are_rejected() {
        let record = codec::encode(&CredentialTree::new());
        for version in [0, CURRENT_SCHEMA_VERSION + 1] {
            let err = decode_tree(record.clone(), version).unwrap_err();
            assert!(matches!(err, CodecError::UnsupportedVersion { found, .. } if found == version));
        }
    }
}
