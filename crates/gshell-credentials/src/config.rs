//! Store Configuration
//!
//! Which backend to use, where the file lives, and whether mutations are
//! written through. Layered: defaults, then `settings.json` in the gShell
//! directory, then environment. Command-line flags are applied by the caller
//! on top with the `with_*` builders.
//!
//! A `credential_file` from settings applies only to the backend settings
//! chose; when the environment selects another backend, that backend's default
//! file in the gShell directory is used instead.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::common::paths::{gshell_dir, SETTINGS_FILE};
use crate::common::{CredentialError, CredentialResult};

/// Environment variable selecting the backend
pub const BACKEND_ENV: &str = "GSHELL_CREDENTIAL_BACKEND";
/// Environment variable overriding the store file
pub const FILE_ENV: &str = "GSHELL_CREDENTIAL_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Encrypted,
    Plaintext,
}

impl Backend {
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Backend::Encrypted => "credentials.bin",
            Backend::Plaintext => "credentials.json",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Encrypted => "encrypted",
            Backend::Plaintext => "plaintext",
        })
    }
}

impl FromStr for Backend {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "encrypted" | "binary" => Ok(Backend::Encrypted),
            "plaintext" | "json" => Ok(Backend::Plaintext),
            other => Err(CredentialError::Config(format!(
                "unknown credential backend '{}' (expected encrypted or plaintext)",
                other
            ))),
        }
    }
}

/// On-disk `settings.json`; every member optional
#[derive(Debug, Default, Deserialize)]
struct Settings {
    credential_backend: Option<Backend>,
    credential_file: Option<PathBuf>,
    autosave: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: Backend,
    pub path: PathBuf,
    /// Write every effective mutation through to the store
    pub autosave: bool,
}

impl StoreConfig {
    pub fn new(backend: Backend, path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            path: path.into(),
            autosave: true,
        }
    }

    /// Resolve from the gShell directory and the process environment.
    pub fn load() -> CredentialResult<Self> {
        Self::load_with(&gshell_dir()?, |name| std::env::var(name).ok())
    }

    /// Resolve from `dir` and an explicit environment lookup.
    pub fn load_with(
        dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> CredentialResult<Self> {
        let settings = read_settings(&dir.join(SETTINGS_FILE))?;

        let configured = settings.credential_backend.unwrap_or_default();
        let backend = match env(BACKEND_ENV).filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.parse()?,
            None => configured,
        };

        // a settings file name belongs to the backend it was configured with
        let settings_file = settings.credential_file.filter(|_| backend == configured);

        let path = env(FILE_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or(settings_file)
            .map(|p| if p.is_relative() { dir.join(p) } else { p })
            .unwrap_or_else(|| dir.join(backend.default_file_name()));

        let config = Self {
            backend,
            path,
            autosave: settings.autosave.unwrap_or(true),
        };
        debug!(?config, "Resolved credential store configuration");
        Ok(config)
    }

    /// Switch backend. A path still at the old backend's default file name
    /// follows to the new one.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        if self.path.file_name() == Some(OsStr::new(self.backend.default_file_name())) {
            self.path.set_file_name(backend.default_file_name());
        }
        self.backend = backend;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }
}

fn read_settings(path: &Path) -> CredentialResult<Settings> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(e) => {
            return Err(CredentialError::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_str(&content).map_err(|e| {
        CredentialError::Config(format!("Failed to parse {}: {}", path.display(), e))
    })
}
