//! Credential Tree
//!
//! Value objects for the four-level hierarchy
//! `CredentialTree → Domain → DomainUser → TokenInfo`, plus the OAuth2 value
//! types handed over by the authorization flow.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ── OAuth2 values ───────────────────────────────────────────────────────────

/// OAuth2 application credential (not a user credential)
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ClientSecrets {
    #[zeroize(skip)]
    pub client_id: String,
    pub client_secret: String,
}

impl ClientSecrets {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Structured token as returned by the token endpoint
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[zeroize(skip)]
    pub token_type: String,
    #[zeroize(skip)]
    pub scope: Option<String>,
    #[zeroize(skip)]
    pub expires_in_seconds: Option<i64>,
    #[zeroize(skip)]
    pub issued_utc: DateTime<Utc>,
}

impl TokenResponse {
    /// A bearer token issued now.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            scope: None,
            expires_in_seconds: None,
            issued_utc: Utc::now(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_expires_in(mut self, seconds: i64) -> Self {
        self.expires_in_seconds = Some(seconds);
        self
    }

    pub fn issued_at(mut self, issued_utc: DateTime<Utc>) -> Self {
        self.issued_utc = issued_utc;
        self
    }

    /// Absolute expiry, derived from `issued_utc + expires_in_seconds`. Not persisted.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in_seconds
            .map(|secs| self.issued_utc + Duration::seconds(secs))
    }

    /// Whether the token expires within `margin_secs` of now.
    /// A token without a lifetime never expires.
    pub fn is_expired(&self, margin_secs: i64) -> bool {
        match self.expires_at() {
            Some(exp) => exp.signed_duration_since(Utc::now()).num_seconds() < margin_secs,
            None => false,
        }
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in_seconds", &self.expires_in_seconds)
            .field("issued_utc", &self.issued_utc)
            .finish()
    }
}

/// A token for one API, with its raw form and granted scopes
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct TokenInfo {
    /// Raw serialized form as received from the token endpoint
    pub token_string: String,
    pub token: TokenResponse,
    #[zeroize(skip)]
    pub scopes: Vec<String>,
}

impl TokenInfo {
    pub fn new(token_string: impl Into<String>, token: TokenResponse, scopes: Vec<String>) -> Self {
        Self {
            token_string: token_string.into(),
            token,
            scopes,
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("token_string", &"[REDACTED]")
            .field("token", &self.token)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Build the `name:version` key identifying one Google API surface.
pub fn api_key(name: &str, version: &str) -> String {
    format!("{}:{}", name, version)
}

// ── Hierarchy ───────────────────────────────────────────────────────────────

/// An authorized account within a domain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainUser {
    /// Name of the owning domain (back-reference only)
    pub domain: String,
    pub user_name: String,
    /// Per-user override of the default client secrets
    pub client_secrets: Option<ClientSecrets>,
    /// Tokens keyed by `name:version`
    pub tokens: BTreeMap<String, TokenInfo>,
}

impl DomainUser {
    pub fn new(domain: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            user_name: user_name.into(),
            ..Default::default()
        }
    }

    /// `user@domain`
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.user_name, self.domain)
    }
}

/// A Google Workspace customer domain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Domain {
    pub name: String,
    /// Empty when unset; need not name an existing user
    pub default_user: String,
    pub users: BTreeMap<String, DomainUser>,
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_default_user(mut self, user_name: impl Into<String>) -> Self {
        self.default_user = user_name.into();
        self
    }
}

/// Root of the credential hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CredentialTree {
    /// Empty when unset; need not name an existing domain
    pub default_domain: String,
    pub default_client_secrets: Option<ClientSecrets>,
    pub domains: BTreeMap<String, Domain>,
}

impl CredentialTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.domains.values().map(|d| d.users.len()).sum()
    }

    pub fn token_count(&self) -> usize {
        self.domains
            .values()
            .flat_map(|d| d.users.values())
            .map(|u| u.tokens.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
            && self.default_domain.is_empty()
            && self.default_client_secrets.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let secrets = ClientSecrets::new("id1", "s3cr3t");
        let out = format!("{:?}", secrets);
        assert!(out.contains("id1"));
        assert!(!out.contains("s3cr3t"));

        let token = TokenResponse::new("ya29.xyz").with_refresh_token("1//refresh");
        let info = TokenInfo::new("{\"raw\":true}", token, vec![]);
        let out = format!("{:?}", info);
        assert!(!out.contains("ya29.xyz"));
        assert!(!out.contains("1//refresh"));
        assert!(!out.contains("raw"));
    }

    #[test]
    fn test_expiry_is_computed() {
        let issued = Utc::now() - Duration::seconds(3000);
        let token = TokenResponse::new("t").issued_at(issued).with_expires_in(3600);
        assert_eq!(token.expires_at(), Some(issued + Duration::seconds(3600)));
        assert!(!token.is_expired(60));
        assert!(token.is_expired(900));

        let forever = TokenResponse::new("t");
        assert_eq!(forever.expires_at(), None);
        assert!(!forever.is_expired(0));
    }

    #[test]
    fn test_counts() {
        let mut tree = CredentialTree::new();
        assert!(tree.is_empty());

        let mut domain = Domain::new("acme.com");
        let mut alice = DomainUser::new("acme.com", "alice");
        alice.tokens.insert(
            api_key("admin", "directory_v1"),
            TokenInfo::new("raw", TokenResponse::new("tok"), vec![]),
        );
        domain.users.insert("alice".into(), alice);
        domain
            .users
            .insert("bob".into(), DomainUser::new("acme.com", "bob"));
        tree.domains.insert("acme.com".into(), domain);

        assert_eq!(tree.user_count(), 2);
        assert_eq!(tree.token_count(), 1);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_has_scope() {
        let info = TokenInfo::new(
            "raw",
            TokenResponse::new("tok"),
            vec!["https://www.googleapis.com/auth/gmail.readonly".into()],
        );
        assert!(info.has_scope("https://www.googleapis.com/auth/gmail.readonly"));
        assert!(!info.has_scope("https://www.googleapis.com/auth/gmail.send"));
    }

    #[test]
    fn test_api_key_format() {
        assert_eq!(api_key("admin", "directory_v1"), "admin:directory_v1");
    }
}
