//! Field Codecs
//!
//! Explicit, hand-written field mappings for every persisted type. A value is
//! written as a [`Record`]: a kind name plus exactly the fields its codec
//! enumerates. Reading reconstructs the value from exactly those fields and
//! rejects anything else, so a schema mismatch surfaces as an error instead of
//! silently dropping data.
//!
//! Records are rendered as `bincode` for the encrypted store and as JSON
//! objects (with a `$kind` member) for the plaintext store. Keyed collections
//! keep their entries under a nested `entries` object so that no key can
//! collide with `$kind`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::model::{ClientSecrets, CredentialTree, Domain, DomainUser, TokenInfo, TokenResponse};

/// JSON member carrying the record kind
const KIND_MEMBER: &str = "$kind";
/// Kind used for keyed collections
const MAP_KIND: &str = "Map";
/// JSON member holding the entries of a keyed collection
const ENTRIES_MEMBER: &str = "entries";

// ── Records ─────────────────────────────────────────────────────────────────

/// A single persisted field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<FieldValue>),
    Record(Record),
}

impl FieldValue {
    fn shape(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
            FieldValue::Record(_) => "record",
        }
    }
}

/// A kind name plus named fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Mutable access to the nested records of a keyed collection field.
    pub fn map_entries_mut(
        &mut self,
        name: &str,
    ) -> Option<impl Iterator<Item = &mut Record>> {
        match self.fields.get_mut(name) {
            Some(FieldValue::Record(map)) if map.kind == MAP_KIND => {
                Some(map.fields.values_mut().filter_map(|v| match v {
                    FieldValue::Record(r) => Some(r),
                    _ => None,
                }))
            }
            _ => None,
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("expected a {expected} record, found {found}")]
    KindMismatch { expected: String, found: String },

    #[error("{kind} is missing field '{field}'")]
    MissingField { kind: String, field: String },

    #[error("{kind}.{field} should be {expected}, found {found}")]
    WrongShape {
        kind: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{kind} has unexpected fields: {}", .fields.join(", "))]
    UnexpectedFields { kind: String, fields: Vec<String> },

    #[error("{kind}.{field} is invalid: {reason}")]
    InvalidValue {
        kind: String,
        field: String,
        reason: String,
    },

    #[error("unsupported schema version {found} (this build reads {oldest} to {current})")]
    UnsupportedVersion { found: u16, oldest: u16, current: u16 },

    #[error("binary decode failed: {0}")]
    Binary(String),

    #[error("document decode failed: {0}")]
    Document(String),
}

// ── Codec trait ─────────────────────────────────────────────────────────────

/// Explicit field mapping for a persisted type.
pub trait FieldCodec: Sized {
    /// Record kind written for this type
    const KIND: &'static str;

    /// Enumerate exactly the persisted fields.
    fn write_fields(&self, w: &mut RecordWriter);

    /// Reconstruct the value from exactly the persisted fields.
    fn read_fields(r: &mut RecordReader) -> Result<Self, CodecError>;
}

/// Encode a value into its record.
pub fn encode<T: FieldCodec>(value: &T) -> Record {
    let mut w = RecordWriter::new(T::KIND);
    value.write_fields(&mut w);
    w.finish()
}

/// Decode a value from its record, rejecting foreign kinds and leftover fields.
pub fn decode<T: FieldCodec>(record: Record) -> Result<T, CodecError> {
    if record.kind != T::KIND {
        return Err(CodecError::KindMismatch {
            expected: T::KIND.to_string(),
            found: record.kind,
        });
    }
    let mut r = RecordReader::new(record);
    let value = T::read_fields(&mut r)?;
    r.finish()?;
    Ok(value)
}

pub struct RecordWriter {
    record: Record,
}

impl RecordWriter {
    pub fn new(kind: &str) -> Self {
        Self {
            record: Record::new(kind),
        }
    }

    pub fn text(&mut self, name: &str, value: &str) {
        self.record.insert(name, FieldValue::Text(value.to_string()));
    }

    pub fn opt_text(&mut self, name: &str, value: Option<&str>) {
        let v = value.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string()));
        self.record.insert(name, v);
    }

    pub fn opt_int(&mut self, name: &str, value: Option<i64>) {
        self.record
            .insert(name, value.map_or(FieldValue::Null, FieldValue::Int));
    }

    pub fn time(&mut self, name: &str, value: &DateTime<Utc>) {
        self.record.insert(name, FieldValue::Text(value.to_rfc3339()));
    }

    pub fn texts(&mut self, name: &str, values: &[String]) {
        let list = values.iter().cloned().map(FieldValue::Text).collect();
        self.record.insert(name, FieldValue::List(list));
    }

    pub fn record<T: FieldCodec>(&mut self, name: &str, value: &T) {
        self.record.insert(name, FieldValue::Record(encode(value)));
    }

    pub fn opt_record<T: FieldCodec>(&mut self, name: &str, value: Option<&T>) {
        let v = value.map_or(FieldValue::Null, |v| FieldValue::Record(encode(v)));
        self.record.insert(name, v);
    }

    /// Keyed collection: one nested record per entry, keyed by the map key.
    pub fn map<T: FieldCodec>(&mut self, name: &str, entries: &BTreeMap<String, T>) {
        let mut map = Record::new(MAP_KIND);
        for (key, value) in entries {
            map.insert(key.clone(), FieldValue::Record(encode(value)));
        }
        self.record.insert(name, FieldValue::Record(map));
    }

    pub fn finish(self) -> Record {
        self.record
    }
}

pub struct RecordReader {
    kind: String,
    fields: BTreeMap<String, FieldValue>,
}

impl RecordReader {
    fn new(record: Record) -> Self {
        Self {
            kind: record.kind,
            fields: record.fields,
        }
    }

    fn take(&mut self, name: &str) -> Result<FieldValue, CodecError> {
        self.fields
            .remove(name)
            .ok_or_else(|| CodecError::MissingField {
                kind: self.kind.clone(),
                field: name.to_string(),
            })
    }

    fn wrong_shape(&self, name: &str, expected: &'static str, found: &FieldValue) -> CodecError {
        CodecError::WrongShape {
            kind: self.kind.clone(),
            field: name.to_string(),
            expected,
            found: found.shape(),
        }
    }

    pub fn invalid(&self, name: &str, reason: impl ToString) -> CodecError {
        CodecError::InvalidValue {
            kind: self.kind.clone(),
            field: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn text(&mut self, name: &str) -> Result<String, CodecError> {
        match self.take(name)? {
            FieldValue::Text(s) => Ok(s),
            other => Err(self.wrong_shape(name, "text", &other)),
        }
    }

    pub fn opt_text(&mut self, name: &str) -> Result<Option<String>, CodecError> {
        match self.take(name)? {
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) => Ok(Some(s)),
            other => Err(self.wrong_shape(name, "text or null", &other)),
        }
    }

    pub fn opt_int(&mut self, name: &str) -> Result<Option<i64>, CodecError> {
        match self.take(name)? {
            FieldValue::Null => Ok(None),
            FieldValue::Int(n) => Ok(Some(n)),
            other => Err(self.wrong_shape(name, "int or null", &other)),
        }
    }

    pub fn time(&mut self, name: &str) -> Result<DateTime<Utc>, CodecError> {
        let raw = self.text(name)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| self.invalid(name, e))
    }

    pub fn texts(&mut self, name: &str) -> Result<Vec<String>, CodecError> {
        match self.take(name)? {
            FieldValue::List(items) => items
                .into_iter()
                .map(|item| match item {
                    FieldValue::Text(s) => Ok(s),
                    other => Err(self.wrong_shape(name, "list of text", &other)),
                })
                .collect(),
            other => Err(self.wrong_shape(name, "list", &other)),
        }
    }

    pub fn record<T: FieldCodec>(&mut self, name: &str) -> Result<T, CodecError> {
        match self.take(name)? {
            FieldValue::Record(r) => decode(r),
            other => Err(self.wrong_shape(name, "record", &other)),
        }
    }

    pub fn opt_record<T: FieldCodec>(&mut self, name: &str) -> Result<Option<T>, CodecError> {
        match self.take(name)? {
            FieldValue::Null => Ok(None),
            FieldValue::Record(r) => decode(r).map(Some),
            other => Err(self.wrong_shape(name, "record or null", &other)),
        }
    }

    pub fn map<T: FieldCodec>(&mut self, name: &str) -> Result<BTreeMap<String, T>, CodecError> {
        let map = match self.take(name)? {
            FieldValue::Record(r) if r.kind == MAP_KIND => r,
            other => return Err(self.wrong_shape(name, "map", &other)),
        };
        let mut out = BTreeMap::new();
        for (key, value) in map.fields {
            match value {
                FieldValue::Record(r) => {
                    out.insert(key, decode(r)?);
                }
                other => return Err(self.wrong_shape(name, "map of records", &other)),
            }
        }
        Ok(out)
    }

    /// Fail if any field was not consumed by the codec.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(CodecError::UnexpectedFields {
                kind: self.kind,
                fields: self.fields.into_keys().collect(),
            })
        }
    }
}

// ── Renderings ──────────────────────────────────────────────────────────────

/// Render a record as bytes for the encrypted store.
pub fn to_binary(record: &Record) -> Result<Vec<u8>, CodecError> {
    bincode::serde::encode_to_vec(record, bincode::config::standard())
        .map_err(|e| CodecError::Binary(e.to_string()))
}

/// Parse bytes produced by [`to_binary`].
pub fn from_binary(bytes: &[u8]) -> Result<Record, CodecError> {
    let (record, read): (Record, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| CodecError::Binary(e.to_string()))?;
    if read != bytes.len() {
        return Err(CodecError::Binary(format!(
            "{} trailing bytes after record",
            bytes.len() - read
        )));
    }
    Ok(record)
}

/// Render a record as a JSON object for the plaintext store.
pub fn to_json(record: &Record) -> Value {
    let fields: Map<String, Value> = record
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), field_to_json(value)))
        .collect();

    let mut obj = Map::new();
    obj.insert(KIND_MEMBER.to_string(), Value::String(record.kind.clone()));
    if record.kind == MAP_KIND {
        obj.insert(ENTRIES_MEMBER.to_string(), Value::Object(fields));
    } else {
        obj.extend(fields);
    }
    Value::Object(obj)
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(n) => Value::from(*n),
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::List(items) => Value::Array(items.iter().map(field_to_json).collect()),
        FieldValue::Record(r) => to_json(r),
    }
}

/// Parse a JSON object produced by [`to_json`].
pub fn from_json(value: Value) -> Result<Record, CodecError> {
    let Value::Object(mut obj) = value else {
        return Err(CodecError::Document("record is not a JSON object".into()));
    };
    let kind = match obj.remove(KIND_MEMBER) {
        Some(Value::String(kind)) => kind,
        _ => {
            return Err(CodecError::Document(format!(
                "record has no '{}' member",
                KIND_MEMBER
            )))
        }
    };

    if kind == MAP_KIND {
        obj = match obj.remove(ENTRIES_MEMBER) {
            Some(Value::Object(entries)) if obj.is_empty() => entries,
            _ => {
                return Err(CodecError::Document(format!(
                    "map record must hold exactly an '{}' object",
                    ENTRIES_MEMBER
                )))
            }
        };
    }

    let mut record = Record::new(kind);
    for (name, value) in obj {
        record.insert(name, field_from_json(value)?);
    }
    Ok(record)
}

fn field_from_json(value: Value) -> Result<FieldValue, CodecError> {
    Ok(match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Number(n) => FieldValue::Int(
            n.as_i64()
                .ok_or_else(|| CodecError::Document(format!("{} is not an integer", n)))?,
        ),
        Value::String(s) => FieldValue::Text(s),
        Value::Array(items) => FieldValue::List(
            items
                .into_iter()
                .map(field_from_json)
                .collect::<Result<_, _>>()?,
        ),
        obj @ Value::Object(_) => FieldValue::Record(from_json(obj)?),
    })
}

// ── Credential types ────────────────────────────────────────────────────────

impl FieldCodec for ClientSecrets {
    const KIND: &'static str = "ClientSecrets";

    fn write_fields(&self, w: &mut RecordWriter) {
        w.text("client_id", &self.client_id);
        w.text("client_secret", &self.client_secret);
    }

    fn read_fields(r: &mut RecordReader) -> Result<Self, CodecError> {
        Ok(ClientSecrets {
            client_id: r.text("client_id")?,
            client_secret: r.text("client_secret")?,
        })
    }
}

impl FieldCodec for TokenResponse {
    const KIND: &'static str = "TokenResponse";

    fn write_fields(&self, w: &mut RecordWriter) {
        w.text("access_token", &self.access_token);
        w.opt_text("refresh_token", self.refresh_token.as_deref());
        w.text("token_type", &self.token_type);
        w.opt_text("scope", self.scope.as_deref());
        w.opt_int("expires_in_seconds", self.expires_in_seconds);
        w.time("issued_utc", &self.issued_utc);
    }

    fn read_fields(r: &mut RecordReader) -> Result<Self, CodecError> {
        Ok(TokenResponse {
            access_token: r.text("access_token")?,
            refresh_token: r.opt_text("refresh_token")?,
            token_type: r.text("token_type")?,
            scope: r.opt_text("scope")?,
            expires_in_seconds: r.opt_int("expires_in_seconds")?,
            issued_utc: r.time("issued_utc")?,
        })
    }
}

impl FieldCodec for TokenInfo {
    const KIND: &'static str = "TokenInfo";

    fn write_fields(&self, w: &mut RecordWriter) {
        w.text("token_string", &self.token_string);
        w.record("token", &self.token);
        w.texts("scopes", &self.scopes);
    }

    fn read_fields(r: &mut RecordReader) -> Result<Self, CodecError> {
        Ok(TokenInfo {
            token_string: r.text("token_string")?,
            token: r.record("token")?,
            scopes: r.texts("scopes")?,
        })
    }
}

impl FieldCodec for DomainUser {
    const KIND: &'static str = "DomainUser";

    fn write_fields(&self, w: &mut RecordWriter) {
        w.text("domain", &self.domain);
        w.text("user_name", &self.user_name);
        w.opt_record("client_secrets", self.client_secrets.as_ref());
        w.map("tokens", &self.tokens);
    }

    fn read_fields(r: &mut RecordReader) -> Result<Self, CodecError> {
        Ok(DomainUser {
            domain: r.text("domain")?,
            user_name: r.text("user_name")?,
            client_secrets: r.opt_record("client_secrets")?,
            tokens: r.map("tokens")?,
        })
    }
}

impl FieldCodec for Domain {
    const KIND: &'static str = "Domain";

    fn write_fields(&self, w: &mut RecordWriter) {
        w.text("name", &self.name);
        w.text("default_user", &self.default_user);
        w.map("users", &self.users);
    }

    fn read_fields(r: &mut RecordReader) -> Result<Self, CodecError> {
        let domain = Domain {
            name: r.text("name")?,
            default_user: r.text("default_user")?,
            users: r.map("users")?,
        };
        check_users(&domain).map_err(|reason| r.invalid("users", reason))?;
        Ok(domain)
    }
}

impl FieldCodec for CredentialTree {
    const KIND: &'static str = "CredentialStore";

    fn write_fields(&self, w: &mut RecordWriter) {
        w.text("default_domain", &self.default_domain);
        w.opt_record("default_client_secrets", self.default_client_secrets.as_ref());
        w.map("domains", &self.domains);
    }

    fn read_fields(r: &mut RecordReader) -> Result<Self, CodecError> {
        let tree = CredentialTree {
            default_domain: r.text("default_domain")?,
            default_client_secrets: r.opt_record("default_client_secrets")?,
            domains: r.map("domains")?,
        };
        check_domains(&tree).map_err(|reason| r.invalid("domains", reason))?;
        Ok(tree)
    }
}

/// Every user is keyed by its name and points back at `domain`.
fn check_users(domain: &Domain) -> Result<(), String> {
    match domain
        .users
        .iter()
        .find(|(key, user)| **key != user.user_name || user.domain != domain.name)
    {
        Some((key, user)) => Err(format!(
            "entry '{}' holds {} which does not belong to {}",
            key,
            user.identifier(),
            domain.name
        )),
        None => Ok(()),
    }
}

/// Every domain is keyed by its name.
fn check_domains(tree: &CredentialTree) -> Result<(), String> {
    match tree.domains.iter().find(|(key, d)| **key != d.name) {
        Some((key, d)) => Err(format!("entry '{}' holds domain '{}'", key, d.name)),
        None => Ok(()),
    }
}

/// Encode a whole tree, refusing one that would not load back.
pub fn encode_tree(tree: &CredentialTree) -> Result<Record, CodecError> {
    let invalid = |kind: &str, field: &str, reason: String| CodecError::InvalidValue {
        kind: kind.to_string(),
        field: field.to_string(),
        reason,
    };

    check_domains(tree).map_err(|reason| invalid(CredentialTree::KIND, "domains", reason))?;
    for domain in tree.domains.values() {
        check_users(domain).map_err(|reason| invalid(Domain::KIND, "users", reason))?;
    }
    Ok(encode(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_tree() -> CredentialTree {
        let issued = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let token = TokenResponse::new("ya29.xyz")
            .with_refresh_token("1//refresh")
            .with_scope("https://www.googleapis.com/auth/admin.directory.user")
            .with_expires_in(3599)
            .issued_at(issued);

        let mut alice = DomainUser::new("acme.com", "alice");
        alice.client_secrets = Some(ClientSecrets::new("alice-id", "alice-secret"));
        alice.tokens.insert(
            "admin:directory_v1".into(),
            TokenInfo::new("{raw}", token, vec!["scopeA".into(), "scopeB".into()]),
        );

        let mut acme = Domain::new("acme.com").with_default_user("alice");
        acme.users.insert("alice".into(), alice);

        let mut tree = CredentialTree::new();
        tree.default_domain = "acme.com".into();
        tree.default_client_secrets = Some(ClientSecrets::new("id1", "s1"));
        tree.domains.insert("acme.com".into(), acme);
        tree.domains.insert("beta.com".into(), Domain::new("beta.com"));
        tree
    }

    #[test]
    fn test_tree_survives_binary_rendering() {
        let tree = sample_tree();
        let bytes = to_binary(&encode(&tree)).unwrap();
        let back: CredentialTree = decode(from_binary(&bytes).unwrap()).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_tree_survives_json_rendering() {
        let tree = sample_tree();
        let json = to_json(&encode(&tree));
        assert_eq!(json["$kind"], "CredentialStore");
        assert_eq!(json["domains"]["entries"]["acme.com"]["default_user"], "alice");

        let back: CredentialTree = decode(from_json(json).unwrap()).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut record = encode(&ClientSecrets::new("id", "secret"));
        record.remove("client_secret");
        let err = decode::<ClientSecrets>(record).unwrap_err();
        assert_eq!(
            err,
            CodecError::MissingField {
                kind: "ClientSecrets".into(),
                field: "client_secret".into()
            }
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut record = encode(&ClientSecrets::new("id", "secret"));
        record.insert("redirect_uris", FieldValue::List(vec![]));
        let err = decode::<ClientSecrets>(record).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedFields { ref fields, .. } if fields == &["redirect_uris"]));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let record = encode(&ClientSecrets::new("id", "secret"));
        let err = decode::<TokenResponse>(record).unwrap_err();
        assert!(matches!(err, CodecError::KindMismatch { .. }));
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let mut record = encode(&TokenResponse::new("tok"));
        record.insert("expires_in_seconds", FieldValue::Text("3600".into()));
        let err = decode::<TokenResponse>(record).unwrap_err();
        assert!(matches!(err, CodecError::WrongShape { expected: "int or null", .. }));
    }

    #[test]
    fn test_misfiled_user_is_rejected() {
        let mut tree = sample_tree();
        let acme = tree.domains.get_mut("acme.com").unwrap();
        acme.users
            .insert("bob".into(), DomainUser::new("beta.com", "bob"));

        let err = decode::<CredentialTree>(encode(&tree)).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue { .. }));
    }

    #[test]
    fn test_map_keys_cannot_shadow_the_kind_member() {
        let mut tree = sample_tree();
        tree.domains.insert("$kind".into(), Domain::new("$kind"));
        tree.domains.insert("entries".into(), Domain::new("entries"));

        let json = to_json(&encode(&tree));
        assert_eq!(json["domains"]["$kind"], "Map");
        let back: CredentialTree = decode(from_json(json).unwrap()).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_map_with_stray_members_is_rejected() {
        let mut json = to_json(&encode(&sample_tree()));
        json["domains"]["extra"] = Value::Bool(true);
        assert!(matches!(from_json(json), Err(CodecError::Document(_))));
    }

    #[test]
    fn test_encode_tree_refuses_misfiled_entries() {
        let mut tree = sample_tree();
        tree.domains
            .get_mut("acme.com")
            .unwrap()
            .users
            .insert("alice".into(), DomainUser::new("", "alice"));
        let err = encode_tree(&tree).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue { ref field, .. } if field == "users"));

        let mut tree = sample_tree();
        tree.domains.insert("gamma.com".into(), Domain::new("delta.com"));
        let err = encode_tree(&tree).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue { ref field, .. } if field == "domains"));

        assert!(encode_tree(&sample_tree()).is_ok());
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = to_binary(&encode(&ClientSecrets::new("id", "s"))).unwrap();
        bytes.push(0);
        assert!(matches!(from_binary(&bytes), Err(CodecError::Binary(_))));
    }
}
