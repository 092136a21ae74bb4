//! In-memory port, shared between clones of the handle.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{CredentialPersistence, LoadedTree};
use crate::common::CredentialResult;
use crate::model::CredentialTree;

#[derive(Debug, Default)]
struct Inner {
    tree: Option<CredentialTree>,
    saves: usize,
}

/// Keeps the saved tree in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `tree`.
    pub fn with_tree(tree: CredentialTree) -> Self {
        let store = Self::new();
        store.lock().tree = Some(tree);
        store
    }

    /// How many times `save` has been called
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// The last saved tree
    pub fn snapshot(&self) -> Option<CredentialTree> {
        self.lock().tree.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a poisoned lock still holds a whole tree
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialPersistence for MemoryStore {
    fn load(&self) -> CredentialResult<Option<LoadedTree>> {
        Ok(self.lock().tree.clone().map(|tree| LoadedTree {
            tree,
            should_save_again: false,
        }))
    }

    fn save(&self, tree: &CredentialTree) -> CredentialResult<()> {
        let mut inner = self.lock();
        inner.tree = Some(tree.clone());
        inner.saves += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
