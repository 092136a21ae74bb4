use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use gshell_credentials::{ClientSecrets, Domain, DomainUser, TokenInfo};
use serde::Serialize;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{output}");
    Ok(())
}

/// Keep a short prefix of a secret, enough to tell two apart.
pub fn mask(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}

// ── Views ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SecretsView {
    pub client_id: String,
    pub client_secret: String,
}

impl From<&ClientSecrets> for SecretsView {
    fn from(s: &ClientSecrets) -> Self {
        Self {
            client_id: s.client_id.clone(),
            client_secret: mask(&s.client_secret),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub domain: String,
    pub user: String,
    pub has_client_secrets: bool,
    pub apis: Vec<String>,
}

impl From<&DomainUser> for UserView {
    fn from(u: &DomainUser) -> Self {
        Self {
            domain: u.domain.clone(),
            user: u.user_name.clone(),
            has_client_secrets: u.client_secrets.is_some(),
            apis: u.tokens.keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DomainView {
    pub name: String,
    pub default_user: Option<String>,
    pub users: Vec<UserView>,
}

impl From<&Domain> for DomainView {
    fn from(d: &Domain) -> Self {
        Self {
            name: d.name.clone(),
            default_user: Some(d.default_user.clone()).filter(|u| !u.is_empty()),
            users: d.users.values().map(UserView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenView {
    pub api: String,
    pub access_token: String,
    pub has_refresh_token: bool,
    pub token_type: String,
    pub scopes: Vec<String>,
    pub issued_utc: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

impl TokenView {
    pub fn new(api: &str, info: &TokenInfo) -> Self {
        Self {
            api: api.to_string(),
            access_token: mask(&info.token.access_token),
            has_refresh_token: info.token.refresh_token.is_some(),
            token_type: info.token.token_type.clone(),
            scopes: info.scopes.clone(),
            issued_utc: info.token.issued_utc,
            expires_at: info.token.expires_at(),
            expired: info.token.is_expired(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gshell_credentials::TokenResponse;

    #[test]
    fn test_mask_hides_secrets() {
        assert_eq!(mask("s1"), "****");
        assert_eq!(mask("ya29.a0AfH6SMBx"), "ya29****");
    }

    #[test]
    fn test_token_view_is_redacted() {
        let info = TokenInfo::new(
            "{raw}",
            TokenResponse::new("ya29.secret-token").with_refresh_token("1//refresh"),
            vec!["scopeA".into()],
        );
        let json = serde_json::to_string(&TokenView::new("gmail:v1", &info)).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(!json.contains("1//refresh"));
        assert!(json.contains("\"has_refresh_token\":true"));
    }
}
