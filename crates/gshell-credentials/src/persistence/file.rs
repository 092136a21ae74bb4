//! File helpers shared by the on-disk stores
//!
//! Whole-file atomic replace (temp file + fsync + rename, owner-only
//! permissions), a lock file giving each store a single writer across
//! processes, and [`StoreFile`], which refuses to overwrite changes another
//! session saved after this one loaded.

use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

use crate::common::{CredentialError, CredentialResult};

/// How long `StoreLock::acquire` waits for another writer
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// A lock file older than this is considered abandoned
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(30);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Read a store file, `None` if it does not exist.
/// Any other read failure means the store is unreadable.
pub fn read_if_exists(path: &Path) -> CredentialResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CredentialError::stale(path, e)),
    }
}

/// Replace `path` with `bytes` in one step.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> CredentialResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CredentialError::persist(parent, e))?;
    }

    let tmp = sibling(path, "tmp");
    let result = write_synced(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(CredentialError::persist(path, e));
    }

    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// `credentials.bin` → `credentials.bin.<ext>`
fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

// ── Tracked store file ──────────────────────────────────────────────────────

/// Content digest of a store file, `None` while the file does not exist
type Revision = Option<[u8; 32]>;

fn revision(data: Option<&[u8]>) -> Revision {
    data.map(|bytes| Sha256::digest(bytes).into())
}

/// A store file that remembers the revision it last read or wrote.
///
/// `replace` takes the [`StoreLock`] and compares the file on disk with that
/// revision first, so two sessions that loaded the same tree cannot silently
/// overwrite each other. A handle that never read the file writes
/// unconditionally.
#[derive(Debug)]
pub struct StoreFile {
    path: PathBuf,
    seen: Mutex<Option<Revision>>,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seen: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, `None` if it does not exist.
    pub fn read(&self) -> CredentialResult<Option<Vec<u8>>> {
        let data = read_if_exists(&self.path)?;
        *self.seen() = Some(revision(data.as_deref()));
        Ok(data)
    }

    /// Replace the file with `bytes` unless another writer got there first.
    pub fn replace(&self, bytes: &[u8]) -> CredentialResult<()> {
        let _lock = StoreLock::acquire(&self.path)?;
        let mut seen = self.seen();

        if let Some(expected) = *seen {
            let current = revision(read_if_exists(&self.path)?.as_deref());
            if current != expected {
                warn!("Credential store {:?} changed since it was loaded", self.path);
                return Err(CredentialError::StoreChanged {
                    path: self.path.clone(),
                });
            }
        }

        write_atomic(&self.path, bytes)?;
        *seen = Some(revision(Some(bytes)));
        Ok(())
    }

    fn seen(&self) -> MutexGuard<'_, Option<Revision>> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Lock ────────────────────────────────────────────────────────────────────

/// Exclusive writer lock for a store file, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Lock `store` for writing, waiting up to [`LOCK_TIMEOUT`].
    pub fn acquire(store: &Path) -> CredentialResult<Self> {
        Self::acquire_with_timeout(store, LOCK_TIMEOUT)
    }

    pub fn acquire_with_timeout(store: &Path, timeout: Duration) -> CredentialResult<Self> {
        if let Some(parent) = store.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CredentialError::persist(parent, e))?;
        }

        let path = sibling(store, "lock");
        let started = Instant::now();

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // The pid is informational; ownership is the file's existence.
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if break_if_abandoned(&path) {
                        continue;
                    }
                    if started.elapsed() >= timeout {
                        return Err(CredentialError::StoreLocked {
                            path: store.to_path_buf(),
                        });
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(CredentialError::persist(&path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release credential store lock {:?}: {}", self.path, e);
        }
    }
}

/// Remove `lock` if it is abandoned.
///
/// Breakers are serialised by a `.break` file and the lock is judged again
/// while holding it, so a waiter never removes the fresh lock another waiter
/// created after breaking the same abandoned one.
fn break_if_abandoned(lock: &Path) -> bool {
    if !is_abandoned(lock) {
        return false;
    }

    let breaker = sibling(lock, "break");
    if OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&breaker)
        .is_err()
    {
        // a breaker that died mid-break
        if is_abandoned(&breaker) {
            let _ = fs::remove_file(&breaker);
        }
        return false;
    }

    let broken = is_abandoned(lock) && fs::remove_file(lock).is_ok();
    if broken {
        warn!("Broke abandoned credential store lock {:?}", lock);
    }
    let _ = fs::remove_file(&breaker);
    broken
}

fn is_abandoned(lock: &Path) -> bool {
    fs::metadata(lock)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}
