//! Encrypted Store
//!
//! Single-file store encrypted with the account key.
//!
//! ```text
//! "GSHC" | envelope v (1) | schema v (u16 LE) | key fingerprint (8) | nonce (12) | ciphertext+tag
//! ```
//!
//! The 15-byte header is authenticated as associated data, so a rewritten
//! schema version or fingerprint fails decryption.

use std::path::PathBuf;
use tracing::info;
use zeroize::Zeroizing;

use super::codec;
use super::file::StoreFile;
use super::schema::{self, CURRENT_SCHEMA_VERSION};
use super::{CredentialPersistence, LoadedTree};
use crate::common::{CredentialError, CredentialResult};
use crate::crypto::{self, AccountKey, FINGERPRINT_SIZE};
use crate::model::CredentialTree;

const MAGIC: &[u8; 4] = b"GSHC";
const ENVELOPE_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + 2 + FINGERPRINT_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    schema_version: u16,
    fingerprint: [u8; FINGERPRINT_SIZE],
}

impl Header {
    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(MAGIC);
        out[4] = ENVELOPE_VERSION;
        out[5..7].copy_from_slice(&self.schema_version.to_le_bytes());
        out[7..].copy_from_slice(&self.fingerprint);
        out
    }

    fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() < HEADER_LEN {
            return Err(format!("file is {} bytes, shorter than the header", data.len()));
        }
        if &data[..4] != MAGIC {
            return Err("not a gShell credential file".to_string());
        }
        if data[4] != ENVELOPE_VERSION {
            return Err(format!("unsupported envelope version {}", data[4]));
        }

        let mut fingerprint = [0u8; FINGERPRINT_SIZE];
        fingerprint.copy_from_slice(&data[7..HEADER_LEN]);
        Ok(Self {
            schema_version: u16::from_le_bytes([data[5], data[6]]),
            fingerprint,
        })
    }
}

/// Credential store encrypted with an account-scoped key
pub struct EncryptedStore {
    file: StoreFile,
    key: AccountKey,
}

impl EncryptedStore {
    /// Store at `path` keyed to the current OS account on this machine.
    pub fn for_current_account(path: impl Into<PathBuf>) -> CredentialResult<Self> {
        let key = AccountKey::for_current_account().map_err(CredentialError::AccountKey)?;
        Ok(Self::with_key(path, key))
    }

    pub fn with_key(path: impl Into<PathBuf>, key: AccountKey) -> Self {
        Self {
            file: StoreFile::new(path),
            key,
        }
    }

    /// Encrypt an already-encoded root record at `schema_version`.
    fn seal(&self, record: &codec::Record, schema_version: u16) -> CredentialResult<Vec<u8>> {
        let plaintext = Zeroizing::new(
            codec::to_binary(record).map_err(|e| CredentialError::Encode(e.to_string()))?,
        );
        let header = Header {
            schema_version,
            fingerprint: self.key.fingerprint(),
        }
        .to_bytes();

        let sealed =
            crypto::encrypt(&self.key, &plaintext, &header).map_err(CredentialError::Encode)?;

        let mut out = Vec::with_capacity(HEADER_LEN + sealed.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn open(&self, data: &[u8]) -> Result<LoadedTree, String> {
        let header = Header::parse(data)?;
        if header.fingerprint != self.key.fingerprint() {
            return Err(format!(
                "written under a different account or machine (key {} but this account is {})",
                hex::encode(header.fingerprint),
                self.key.fingerprint_hex()
            ));
        }

        let plaintext = Zeroizing::new(crypto::decrypt(
            &self.key,
            &data[HEADER_LEN..],
            &data[..HEADER_LEN],
        )?);
        let record = codec::from_binary(&plaintext).map_err(|e| e.to_string())?;
        schema::decode_tree(record, header.schema_version).map_err(|e| e.to_string())
    }
}

impl CredentialPersistence for EncryptedStore {
    fn load(&self) -> CredentialResult<Option<LoadedTree>> {
        let path = self.file.path();
        let Some(data) = self.file.read()? else {
            info!("No credential store at {:?} yet", path);
            return Ok(None);
        };

        let loaded = self
            .open(&data)
            .map_err(|reason| CredentialError::stale(path, reason))?;

        info!(
            "Loaded credential store from {:?} ({} domains, {} users)",
            path,
            loaded.tree.domains.len(),
            loaded.tree.user_count()
        );
        Ok(Some(loaded))
    }

    fn save(&self, tree: &CredentialTree) -> CredentialResult<()> {
        let record =
            codec::encode_tree(tree).map_err(|e| CredentialError::Encode(e.to_string()))?;
        let bytes = self.seal(&record, CURRENT_SCHEMA_VERSION)?;
        self.file.replace(&bytes)?;

        info!(
            "Saved credential store to {:?} ({} domains, {} tokens)",
            self.file.path(),
            tree.domains.len(),
            tree.token_count()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("encrypted store {}", self.file.path().display())
    }
}
