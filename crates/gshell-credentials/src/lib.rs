//! gShell credential store
//!
//! Hierarchical, locally persisted OAuth2 state for many Google Workspace
//! domains: users per domain, tokens per API per user, and fallback client
//! secrets.
//!
//! ```text
//! command wrappers → CredentialConsumer → CredentialTree → CredentialPersistence → disk
//! ```
//!
//! ```ignore
//! let config = StoreConfig::load()?;
//! let mut creds = CredentialConsumer::open(&config)?;
//! let target = creds.resolve_target(None, None)?;
//! let secrets = creds.resolve_client_secrets(&target.domain, &target.user)?;
//! ```

pub mod common;
pub mod config;
pub mod consumer;
pub mod crypto;
pub mod model;
pub mod persistence;
pub mod resolve;

pub use common::{CredentialError, CredentialResult, ErrorCode};
pub use config::{Backend, StoreConfig};
pub use consumer::CredentialConsumer;
pub use model::{api_key, ClientSecrets, CredentialTree, Domain, DomainUser, TokenInfo, TokenResponse};
pub use persistence::{
    CredentialPersistence, EncryptedStore, LoadedTree, MemoryStore, PlaintextStore,
};
pub use resolve::{CredentialTarget, ResolvedSecrets, SecretsSource};
