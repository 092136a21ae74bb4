//! Defaulting rules
//!
//! Most specific override first, then the global default, then an
//! "unconfigured" error the caller can turn into interactive setup.

use serde::Serialize;

use crate::common::{CredentialError, CredentialResult};
use crate::consumer::CredentialConsumer;
use crate::model::ClientSecrets;

/// Where resolved client secrets came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretsSource {
    User,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSecrets<'a> {
    pub secrets: &'a ClientSecrets,
    pub source: SecretsSource,
}

/// The domain and user a call runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialTarget {
    pub domain: String,
    pub user: String,
}

impl CredentialConsumer {
    /// Per-user client secrets, else the default ones.
    pub fn resolve_client_secrets(
        &self,
        domain: &str,
        user: &str,
    ) -> CredentialResult<ResolvedSecrets<'_>> {
        if let Some(secrets) = self.get_client_secrets(domain, user) {
            return Ok(ResolvedSecrets {
                secrets,
                source: SecretsSource::User,
            });
        }
        if let Some(secrets) = self.get_default_client_secrets() {
            return Ok(ResolvedSecrets {
                secrets,
                source: SecretsSource::Default,
            });
        }
        Err(CredentialError::NoClientSecrets {
            domain: domain.to_string(),
            user: user.to_string(),
        })
    }

    /// `explicit` when given, else the default domain.
    pub fn resolve_domain(&self, explicit: Option<&str>) -> CredentialResult<String> {
        pick(explicit, self.get_default_domain()).ok_or(CredentialError::NoDomainConfigured)
    }

    /// `explicit` when given, else the default user of `domain`.
    pub fn resolve_user(&self, domain: &str, explicit: Option<&str>) -> CredentialResult<String> {
        pick(explicit, self.get_default_user(domain)).ok_or_else(|| {
            CredentialError::NoUserConfigured {
                domain: domain.to_string(),
            }
        })
    }

    pub fn resolve_target(
        &self,
        domain: Option<&str>,
        user: Option<&str>,
    ) -> CredentialResult<CredentialTarget> {
        let domain = self.resolve_domain(domain)?;
        let user = self.resolve_user(&domain, user)?;
        Ok(CredentialTarget { domain, user })
    }
}

fn pick(explicit: Option<&str>, fallback: &str) -> Option<String> {
    explicit
        .filter(|s| !s.is_empty())
        .or(Some(fallback).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, DomainUser};
    use crate::persistence::MemoryStore;

    fn consumer() -> CredentialConsumer {
        let mut c = CredentialConsumer::new(Box::new(MemoryStore::new())).unwrap();
        c.set_domain(Domain::new("acme.com")).unwrap();
        c.set_user("acme.com", DomainUser::new("acme.com", "alice"))
            .unwrap();
        c
    }

    #[test]
    fn test_user_secrets_win_over_default() {
        let mut c = consumer();
        c.set_default_client_secrets(ClientSecrets::new("id1", "s1"))
            .unwrap();
        c.set_client_secrets("acme.com", "alice", ClientSecrets::new("a-id", "a-s"))
            .unwrap();

        let resolved = c.resolve_client_secrets("acme.com", "alice").unwrap();
        assert_eq!(resolved.source, SecretsSource::User);
        assert_eq!(resolved.secrets.client_id, "a-id");
    }

    #[test]
    fn test_default_secrets_fallback() {
        let mut c = consumer();
        c.set_default_client_secrets(ClientSecrets::new("id1", "s1"))
            .unwrap();

        let resolved = c.resolve_client_secrets("acme.com", "alice").unwrap();
        assert_eq!(resolved.source, SecretsSource::Default);
        assert_eq!(resolved.secrets.client_id, "id1");

        // unknown users fall back too
        let resolved = c.resolve_client_secrets("other.com", "zed").unwrap();
        assert_eq!(resolved.source, SecretsSource::Default);
    }

    #[test]
    fn test_no_secrets_is_unconfigured() {
        let c = consumer();
        let err = c.resolve_client_secrets("acme.com", "alice").unwrap_err();
        assert!(matches!(err, CredentialError::NoClientSecrets { .. }));
    }

    #[test]
    fn test_resolve_target() {
        let mut c = consumer();
        assert!(matches!(
            c.resolve_target(None, None),
            Err(CredentialError::NoDomainConfigured)
        ));

        c.set_default_domain("acme.com").unwrap();
        assert!(matches!(
            c.resolve_target(None, None),
            Err(CredentialError::NoUserConfigured { ref domain }) if domain == "acme.com"
        ));

        c.set_default_user("acme.com", "alice").unwrap();
        assert_eq!(
            c.resolve_target(None, None).unwrap(),
            CredentialTarget {
                domain: "acme.com".into(),
                user: "alice".into()
            }
        );

        let explicit = c.resolve_target(Some("beta.com"), Some("bob")).unwrap();
        assert_eq!(explicit.domain, "beta.com");
        assert_eq!(explicit.user, "bob");

        // explicit domain without a default user
        assert!(c.resolve_target(Some("beta.com"), None).is_err());
    }

    #[test]
    fn test_empty_explicit_falls_back() {
        let mut c = consumer();
        c.set_default_domain("acme.com").unwrap();
        assert_eq!(c.resolve_domain(Some("")).unwrap(), "acme.com");
    }
}
