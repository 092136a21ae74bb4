//! Persistence Port
//!
//! Durability for the credential tree. A port loads the whole tree once and
//! replaces it whole on save; it is never consulted mid-session.
//!
//! - [`EncryptedStore`]: account-scoped AES-256-GCM over the binary record encoding
//! - [`PlaintextStore`]: the same records as a human-readable JSON document
//! - [`MemoryStore`]: in-process only

pub mod codec;
pub mod encrypted;
pub mod file;
pub mod memory;
pub mod plaintext;
pub mod schema;

use tracing::{info, warn};

use crate::common::CredentialResult;
use crate::config::{Backend, StoreConfig};
use crate::model::CredentialTree;

pub use encrypted::EncryptedStore;
pub use memory::MemoryStore;
pub use plaintext::PlaintextStore;
pub use schema::CURRENT_SCHEMA_VERSION;

/// A tree as read back from a port
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTree {
    pub tree: CredentialTree,
    /// Read from an older shape; should be re-persisted in the current one
    pub should_save_again: bool,
}

/// Load/save contract for the credential tree.
pub trait CredentialPersistence {
    /// Read the persisted tree. `Ok(None)` means nothing has been stored yet;
    /// an unreadable store is `CredentialError::StaleStore`.
    fn load(&self) -> CredentialResult<Option<LoadedTree>>;

    /// Replace the persisted tree with `tree`.
    fn save(&self, tree: &CredentialTree) -> CredentialResult<()>;

    /// Where the tree lives, for messages.
    fn describe(&self) -> String;
}

impl<P: CredentialPersistence + ?Sized> CredentialPersistence for Box<P> {
    fn load(&self) -> CredentialResult<Option<LoadedTree>> {
        (**self).load()
    }

    fn save(&self, tree: &CredentialTree) -> CredentialResult<()> {
        (**self).save(tree)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Build the port selected by `config`.
pub fn open_port(config: &StoreConfig) -> CredentialResult<Box<dyn CredentialPersistence>> {
    Ok(match config.backend {
        Backend::Encrypted => Box::new(EncryptedStore::for_current_account(&config.path)?),
        Backend::Plaintext => {
            warn!("Credential store at {:?} is not encrypted", config.path);
            Box::new(PlaintextStore::new(&config.path))
        }
    })
}

/// Copy whatever `from` holds into `to`, upgrading it to the current schema.
/// Returns `false` when `from` is empty.
pub fn copy_tree(
    from: &dyn CredentialPersistence,
    to: &dyn CredentialPersistence,
) -> CredentialResult<bool> {
    let Some(loaded) = from.load()? else {
        return Ok(false);
    };
    to.save(&loaded.tree)?;
    info!(
        "Copied credential store from {} to {} ({} domains)",
        from.describe(),
        to.describe(),
        loaded.tree.domains.len()
    );
    Ok(true)
}
