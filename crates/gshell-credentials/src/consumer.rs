//! Credential Consumer
//!
//! The session handle every caller goes through. It owns one persistence
//! port and the in-memory tree, which is hydrated once at construction and is
//! authoritative for the rest of the session. With autosave on, every
//! mutation that changes the tree is written through to the port, and a
//! mutation whose save fails is not applied.
//!
//! Absence is never an error: getters return `None`, `""` or `false`, and
//! removers are no-ops when there is nothing to remove.

use tracing::{debug, info};

use crate::common::{CredentialError, CredentialResult};
use crate::config::StoreConfig;
use crate::model::{ClientSecrets, CredentialTree, Domain, DomainUser, TokenInfo, TokenResponse};
use crate::persistence::{self, CredentialPersistence};

pub struct CredentialConsumer {
    port: Box<dyn CredentialPersistence>,
    tree: CredentialTree,
    autosave: bool,
}

impl CredentialConsumer {
    /// Hydrate a session from `port`. A tree read in an older schema is
    /// written back once in the current one.
    pub fn new(port: Box<dyn CredentialPersistence>) -> CredentialResult<Self> {
        let (tree, resave) = match port.load()? {
            Some(loaded) => (loaded.tree, loaded.should_save_again),
            None => (CredentialTree::new(), false),
        };

        if resave {
            info!("Re-saving {} in the current schema", port.describe());
            port.save(&tree)?;
        }

        Ok(Self {
            port,
            tree,
            autosave: true,
        })
    }

    /// Open the store selected by `config`.
    pub fn open(config: &StoreConfig) -> CredentialResult<Self> {
        let mut consumer = Self::new(persistence::open_port(config)?)?;
        consumer.autosave = config.autosave;
        Ok(consumer)
    }

    // ── Session ─────────────────────────────────────────────────────────

    /// Write the whole tree to the port.
    pub fn save(&self) -> CredentialResult<()> {
        self.port.save(&self.tree)
    }

    pub fn set_autosave(&mut self, autosave: bool) {
        self.autosave = autosave;
    }

    pub fn autosave(&self) -> bool {
        self.autosave
    }

    /// Read-only view of the whole tree
    pub fn tree(&self) -> &CredentialTree {
        &self.tree
    }

    /// Where this session persists to
    pub fn persistence(&self) -> String {
        self.port.describe()
    }

    /// Apply `change` to a copy of the tree and adopt the copy once it is
    /// persisted, so a failed save leaves the session as it was. `change`
    /// reports whether it changed anything; nothing is saved when it did not.
    fn apply(
        &mut self,
        change: impl FnOnce(&mut CredentialTree) -> CredentialResult<bool>,
    ) -> CredentialResult<()> {
        let mut next = self.tree.clone();
        if !change(&mut next)? {
            return Ok(());
        }
        if self.autosave {
            self.port.save(&next)?;
        }
        self.tree = next;
        Ok(())
    }

    // ── Domains ─────────────────────────────────────────────────────────

    pub fn get_domain(&self, domain: &str) -> Option<&Domain> {
        self.tree.domains.get(domain)
    }

    pub fn get_all_domains(&self) -> Vec<&Domain> {
        self.tree.domains.values().collect()
    }

    /// Insert or replace a domain, keyed by its own name.
    pub fn set_domain(&mut self, mut domain: Domain) -> CredentialResult<()> {
        // users are re-keyed by name and pointed back at this domain
        let name = domain.name.clone();
        domain.users = std::mem::take(&mut domain.users)
            .into_values()
            .map(|mut user| {
                user.domain = name.clone();
                (user.user_name.clone(), user)
            })
            .collect();

        debug!(domain = %name, users = domain.users.len(), "Set domain");
        self.apply(|tree| {
            tree.domains.insert(name, domain);
            Ok(true)
        })
    }

    pub fn domain_exists(&self, domain: &str) -> bool {
        self.tree.domains.contains_key(domain)
    }

    /// Remove a domain with all of its users and their tokens.
    pub fn remove_domain(&mut self, domain: &str) -> CredentialResult<()> {
        self.apply(|tree| {
            let removed = tree.domains.remove(domain);
            if let Some(d) = &removed {
                debug!(domain = %domain, users = d.users.len(), "Removed domain");
            }
            Ok(removed.is_some())
        })
    }

    pub fn remove_all_domains(&mut self) -> CredentialResult<()> {
        debug!("Removed all domains");
        self.apply(|tree| {
            let had_any = !tree.domains.is_empty();
            tree.domains.clear();
            Ok(had_any)
        })
    }

    // ── Default domain ──────────────────────────────────────────────────

    /// Default domain name, `""` when unset.
    pub fn get_default_domain(&self) -> &str {
        &self.tree.default_domain
    }

    pub fn set_default_domain(&mut self, domain: &str) -> CredentialResult<()> {
        debug!(domain = %domain, "Set default domain");
        self.apply(|tree| {
            tree.default_domain = domain.to_string();
            Ok(true)
        })
    }

    pub fn default_domain_exists(&self) -> bool {
        !self.tree.default_domain.is_empty()
    }

    /// Clear the default domain pointer; the domain itself is kept.
    pub fn remove_default_domain(&mut self) -> CredentialResult<()> {
        self.apply(|tree| Ok(!std::mem::take(&mut tree.default_domain).is_empty()))
    }

    // ── Users ───────────────────────────────────────────────────────────

    pub fn get_user(&self, domain: &str, user: &str) -> Option<&DomainUser> {
        self.tree.domains.get(domain)?.users.get(user)
    }

    /// Users of one domain; empty when the domain does not exist.
    pub fn get_all_users_in(&self, domain: &str) -> Vec<&DomainUser> {
        self.tree
            .domains
            .get(domain)
            .map(|d| d.users.values().collect())
            .unwrap_or_default()
    }

    /// Users of every domain.
    pub fn get_all_users(&self) -> Vec<&DomainUser> {
        self.tree
            .domains
            .values()
            .flat_map(|d| d.users.values())
            .collect()
    }

    /// Insert or replace a user in an existing domain.
    ///
    /// Fails with [`CredentialError::DomainNotFound`] instead of creating the
    /// domain.
    pub fn set_user(&mut self, domain: &str, mut user: DomainUser) -> CredentialResult<()> {
        self.apply(|tree| {
            let d = domain_mut(tree, domain)?;
            user.domain = domain.to_string();
            debug!(user = %user.identifier(), "Set user");
            d.users.insert(user.user_name.clone(), user);
            Ok(true)
        })
    }

    pub fn user_exists(&self, domain: &str, user: &str) -> bool {
        self.get_user(domain, user).is_some()
    }

    pub fn remove_user(&mut self, domain: &str, user: &str) -> CredentialResult<()> {
        self.apply(|tree| {
            let removed = tree
                .domains
                .get_mut(domain)
                .and_then(|d| d.users.remove(user))
                .is_some();
            if removed {
                debug!(domain = %domain, user = %user, "Removed user");
            }
            Ok(removed)
        })
    }

    // ── Default user ────────────────────────────────────────────────────

    /// Default user of `domain`, `""` when unset or when the domain is missing.
    pub fn get_default_user(&self, domain: &str) -> &str {
        self.tree
            .domains
            .get(domain)
            .map(|d| d.default_user.as_str())
            .unwrap_or("")
    }

    pub fn set_default_user(&mut self, domain: &str, user: &str) -> CredentialResult<()> {
        self.apply(|tree| {
            domain_mut(tree, domain)?.default_user = user.to_string();
            debug!(domain = %domain, user = %user, "Set default user");
            Ok(true)
        })
    }

    pub fn default_user_exists(&self, domain: &str) -> bool {
        !self.get_default_user(domain).is_empty()
    }

    /// Clear the default user pointer; the user itself is kept.
    pub fn remove_default_user(&mut self, domain: &str) -> CredentialResult<()> {
        self.apply(|tree| {
            Ok(match tree.domains.get_mut(domain) {
                Some(d) => !std::mem::take(&mut d.default_user).is_empty(),
                None => false,
            })
        })
    }

    // ── Tokens and scopes ───────────────────────────────────────────────

    pub fn get_token_info(&self, domain: &str, user: &str, api: &str) -> Option<&TokenInfo> {
        self.get_user(domain, user)?.tokens.get(api)
    }

    /// Store the token granted for `api`, creating the user if needed.
    pub fn set_token_and_scopes(
        &mut self,
        domain: &str,
        user: &str,
        api: &str,
        token_string: &str,
        token: TokenResponse,
        scopes: Vec<String>,
    ) -> CredentialResult<()> {
        self.apply(|tree| {
            user_mut_or_insert(tree, domain, user)?
                .tokens
                .insert(api.to_string(), TokenInfo::new(token_string, token, scopes));
            debug!(domain = %domain, user = %user, api = %api, "Set token");
            Ok(true)
        })
    }

    pub fn token_and_scopes_exist(&self, domain: &str, user: &str, api: &str) -> bool {
        self.get_token_info(domain, user, api).is_some()
    }

    pub fn remove_token_and_scopes(
        &mut self,
        domain: &str,
        user: &str,
        api: &str,
    ) -> CredentialResult<()> {
        self.apply(|tree| {
            let removed = tree
                .domains
                .get_mut(domain)
                .and_then(|d| d.users.get_mut(user))
                .and_then(|u| u.tokens.remove(api))
                .is_some();
            if removed {
                debug!(domain = %domain, user = %user, api = %api, "Removed token");
            }
            Ok(removed)
        })
    }

    // ── Client secrets ──────────────────────────────────────────────────

    /// Per-user client secrets only; see `resolve_client_secrets` for the
    /// fallback to the default.
    pub fn get_client_secrets(&self, domain: &str, user: &str) -> Option<&ClientSecrets> {
        self.get_user(domain, user)?.client_secrets.as_ref()
    }

    pub fn set_client_secrets(
        &mut self,
        domain: &str,
        user: &str,
        secrets: ClientSecrets,
    ) -> CredentialResult<()> {
        self.apply(|tree| {
            user_mut_or_insert(tree, domain, user)?.client_secrets = Some(secrets);
            debug!(domain = %domain, user = %user, "Set client secrets");
            Ok(true)
        })
    }

    pub fn client_secrets_exist(&self, domain: &str, user: &str) -> bool {
        self.get_client_secrets(domain, user).is_some()
    }

    pub fn remove_client_secrets(&mut self, domain: &str, user: &str) -> CredentialResult<()> {
        self.apply(|tree| {
            Ok(tree
                .domains
                .get_mut(domain)
                .and_then(|d| d.users.get_mut(user))
                .and_then(|u| u.client_secrets.take())
                .is_some())
        })
    }

    // ── Default client secrets ──────────────────────────────────────────

    pub fn get_default_client_secrets(&self) -> Option<&ClientSecrets> {
        self.tree.default_client_secrets.as_ref()
    }

    pub fn set_default_client_secrets(&mut self, secrets: ClientSecrets) -> CredentialResult<()> {
        debug!(client_id = %secrets.client_id, "Set default client secrets");
        self.apply(|tree| {
            tree.default_client_secrets = Some(secrets);
            Ok(true)
        })
    }

    pub fn default_client_secrets_exist(&self) -> bool {
        self.tree.default_client_secrets.is_some()
    }

    pub fn remove_default_client_secrets(&mut self) -> CredentialResult<()> {
        self.apply(|tree| Ok(tree.default_client_secrets.take().is_some()))
    }
}

fn domain_mut<'t>(tree: &'t mut CredentialTree, domain: &str) -> CredentialResult<&'t mut Domain> {
    tree.domains
        .get_mut(domain)
        .ok_or_else(|| CredentialError::DomainNotFound(domain.to_string()))
}

fn user_mut_or_insert<'t>(
    tree: &'t mut CredentialTree,
    domain: &str,
    user: &str,
) -> CredentialResult<&'t mut DomainUser> {
    Ok(domain_mut(tree, domain)?
        .users
        .entry(user.to_string())
        .or_insert_with(|| DomainUser::new(domain, user)))
}

impl std::fmt::Debug for CredentialConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConsumer")
            .field("port", &self.port.describe())
            .field("tree", &self.tree)
            .field("autosave", &self.autosave)
            .finish()
    }
}
