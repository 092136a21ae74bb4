//! Common Utilities
//!
//! Shared error handling, result alias and path resolution.

pub mod error;
pub mod paths;
pub mod result;

pub use error::{CredentialError, ErrorCode};
pub use paths::{gshell_dir, settings_path};
pub use result::CredentialResult;
