//! Common Error Types
//!
//! Unified error handling for the credential store, with stable numeric codes
//! that the command line surfaces as exit statuses.

use std::path::{Path, PathBuf};

/// Stable error codes.
///
/// 10-19: lookups and defaulting, 20-29: persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    DomainNotFound = 10,
    NoDomainConfigured = 11,
    NoUserConfigured = 12,
    NoClientSecrets = 13,

    StaleStore = 20,
    StoreLocked = 21,
    Persist = 22,
    AccountKey = 23,
    Encode = 24,
    Config = 25,
    StoreChanged = 26,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Errors raised by the credential consumer and its persistence ports.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("No domain was given and no default domain is configured")]
    NoDomainConfigured,

    #[error("No user was given and domain {domain} has no default user")]
    NoUserConfigured { domain: String },

    #[error(
        "No client credentials configured for {user}@{domain} and no default client secrets are set"
    )]
    NoClientSecrets { domain: String, user: String },

    #[error(
        "Credential store at {} is stale or unreadable ({reason}). Delete the file and re-authenticate.",
        .path.display()
    )]
    StaleStore { path: PathBuf, reason: String },

    #[error("Credential store at {} is locked by another gShell process", .path.display())]
    StoreLocked { path: PathBuf },

    #[error(
        "Credential store at {} was changed by another gShell session since it was loaded; run the command again",
        .path.display()
    )]
    StoreChanged { path: PathBuf },

    #[error("Failed to write credential store at {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not derive the account key: {0}")]
    AccountKey(String),

    #[error("Failed to encode credential store: {0}")]
    Encode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CredentialError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CredentialError::DomainNotFound(_) => ErrorCode::DomainNotFound,
            CredentialError::NoDomainConfigured => ErrorCode::NoDomainConfigured,
            CredentialError::NoUserConfigured { .. } => ErrorCode::NoUserConfigured,
            CredentialError::NoClientSecrets { .. } => ErrorCode::NoClientSecrets,
            CredentialError::StaleStore { .. } => ErrorCode::StaleStore,
            CredentialError::StoreLocked { .. } => ErrorCode::StoreLocked,
            CredentialError::StoreChanged { .. } => ErrorCode::StoreChanged,
            CredentialError::Persist { .. } => ErrorCode::Persist,
            CredentialError::AccountKey(_) => ErrorCode::AccountKey,
            CredentialError::Encode(_) => ErrorCode::Encode,
            CredentialError::Config(_) => ErrorCode::Config,
        }
    }

    /// Create a stale store error for the file at `path`
    pub fn stale(path: &Path, reason: impl ToString) -> Self {
        Self::StaleStore {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Create a write failure error for the file at `path`
    pub fn persist(path: &Path, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, CredentialError::StaleStore { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_message_names_path_and_remedy() {
        let err = CredentialError::stale(Path::new("/tmp/creds.bin"), "bad tag");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/creds.bin"));
        assert!(msg.contains("bad tag"));
        assert!(msg.contains("Delete the file and re-authenticate"));
        assert!(err.is_stale());
        assert_eq!(err.code(), ErrorCode::StaleStore);
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::DomainNotFound.code(), 10);
        assert_eq!(ErrorCode::StaleStore.code(), 20);
        assert_eq!(ErrorCode::StoreChanged.code(), 26);
        assert_eq!(
            CredentialError::DomainNotFound("acme.com".into()).code(),
            ErrorCode::DomainNotFound
        );
    }
}
