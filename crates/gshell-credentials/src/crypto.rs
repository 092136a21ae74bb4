//! Cryptographic utilities for the credential store
//!
//! - AES-256-GCM for the store at rest, with the file header as associated data
//! - Account-scoped key: HKDF-SHA256 over machine identity + OS account, salted
//!   with a fixed additional-entropy constant
//! - Key fingerprints, so a file written under another account can be told apart
//!   from a corrupted one

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256-GCM nonce size (96 bits)
pub const NONCE_SIZE: usize = 12;
/// AES-256 key size (256 bits)
pub const KEY_SIZE: usize = 32;
/// Bytes of SHA-256(key) kept as the key fingerprint
pub const FINGERPRINT_SIZE: usize = 8;

/// Fixed additional entropy mixed into every account key.
const ADDITIONAL_ENTROPY: &[u8; 32] = &[
    0x67, 0x53, 0x68, 0x65, 0x6c, 0x6c, 0x2d, 0x63, 0x72, 0x65, 0x64, 0x73, 0x9e, 0x41, 0x07, 0xd2,
    0x5b, 0xc8, 0x3a, 0x91, 0xf4, 0x0e, 0x66, 0x2d, 0xb7, 0x18, 0xca, 0x53, 0x7f, 0xe0, 0x24, 0x8d,
];
/// HKDF info label
const KEY_INFO: &[u8] = b"gshell credential store v1";

// ── Account key ─────────────────────────────────────────────────────────────

/// Identity the account key is derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub machine_id: String,
    pub account: String,
}

impl AccountIdentity {
    /// Identity of the current OS account on this machine.
    pub fn current() -> Result<Self, String> {
        Ok(Self {
            machine_id: machine_id()?,
            account: account_name()?,
        })
    }
}

/// 256-bit store key, zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccountKey([u8; KEY_SIZE]);

impl AccountKey {
    /// Derive the key for the current OS account on this machine.
    pub fn for_current_account() -> Result<Self, String> {
        let identity = AccountIdentity::current()?;
        let key = Self::derive(&identity)?;
        debug!(fingerprint = %key.fingerprint_hex(), "Derived account key");
        Ok(key)
    }

    /// Derive the key for an explicit identity.
    pub fn derive(identity: &AccountIdentity) -> Result<Self, String> {
        let mut ikm = Vec::with_capacity(identity.machine_id.len() + identity.account.len() + 1);
        ikm.extend_from_slice(identity.machine_id.as_bytes());
        ikm.push(0);
        ikm.extend_from_slice(identity.account.as_bytes());

        let hk = Hkdf::<Sha256>::new(Some(ADDITIONAL_ENTROPY), &ikm);
        let mut okm = [0u8; KEY_SIZE];
        let expanded = hk
            .expand(KEY_INFO, &mut okm)
            .map_err(|e| format!("Key expansion failed: {}", e));
        ikm.zeroize();
        expanded?;

        Ok(Self(okm))
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Random key, for stores that do not need to be re-opened by another process.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// First bytes of SHA-256(key); safe to store next to the ciphertext.
    pub fn fingerprint(&self) -> [u8; FINGERPRINT_SIZE] {
        let digest = Sha256::digest(self.0);
        let mut out = [0u8; FINGERPRINT_SIZE];
        out.copy_from_slice(&digest[..FINGERPRINT_SIZE]);
        out
    }

    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint())
    }
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccountKey")
            .field(&self.fingerprint_hex())
            .finish()
    }
}

// ── Encryption / Decryption ─────────────────────────────────────────────────

/// Encrypt plaintext bytes with AES-256-GCM, authenticating `aad` alongside.
/// Returns: nonce (12 bytes) || ciphertext+tag
pub fn encrypt(key: &AccountKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| format!("Encryption failed: {}", e))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data produced by `encrypt()` with the same `aad`.
pub fn decrypt(key: &AccountKey, data: &[u8], aad: &[u8]) -> Result<Vec<u8>, String> {
    if data.len() < NONCE_SIZE {
        return Err("Ciphertext too short".to_string());
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|e| format!("Decryption failed: {}", e))
}

// ── Machine / account identity ──────────────────────────────────────────────

#[cfg(unix)]
fn machine_id() -> Result<String, String> {
    const CANDIDATES: &[&str] = &[
        "/etc/machine-id",
        "/var/lib/dbus/machine-id",
        "/etc/hostid",
        "/etc/hostname",
    ];

    for path in CANDIDATES {
        if let Ok(raw) = std::fs::read_to_string(path) {
            let id = raw.trim();
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }
    }

    non_empty_env(&["HOSTNAME"])
        .ok_or_else(|| "Could not determine a machine identifier".to_string())
}

#[cfg(windows)]
fn machine_id() -> Result<String, String> {
    non_empty_env(&["COMPUTERNAME"])
        .ok_or_else(|| "Could not determine a machine identifier".to_string())
}

fn account_name() -> Result<String, String> {
    if let Some(name) = non_empty_env(&["USER", "USERNAME", "LOGNAME"]) {
        return Ok(name);
    }
    dirs::home_dir()
        .map(|home| home.display().to_string())
        .ok_or_else(|| "Could not determine the current account".to_string())
}

fn non_empty_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
