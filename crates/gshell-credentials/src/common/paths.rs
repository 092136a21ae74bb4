//! Path Utilities
//!
//! Common path resolution for the gShell application-data directory.

use std::path::PathBuf;

use super::error::CredentialError;
use super::result::CredentialResult;

/// Environment variable overriding the gShell directory
pub const GSHELL_HOME_ENV: &str = "GSHELL_HOME";

/// Settings file name inside the gShell directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Get the gShell base directory.
///
/// `$GSHELL_HOME` if set, otherwise `<data dir>/gShell` (e.g.
/// `~/.local/share/gShell`, `%APPDATA%\gShell`), otherwise `~/.gshell`.
pub fn gshell_dir() -> CredentialResult<PathBuf> {
    if let Some(dir) = std::env::var_os(GSHELL_HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    if let Some(data) = dirs::data_dir() {
        return Ok(data.join("gShell"));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| CredentialError::Config("Could not determine home directory".into()))?;
    Ok(home.join(".gshell"))
}

/// Get the settings file path
pub fn settings_path() -> CredentialResult<PathBuf> {
    Ok(gshell_dir()?.join(SETTINGS_FILE))
}
