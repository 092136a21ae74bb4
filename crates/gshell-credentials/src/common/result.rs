//! Common Result Type

use super::error::CredentialError;

/// Result type used throughout the credential store.
pub type CredentialResult<T> = Result<T, CredentialError>;
