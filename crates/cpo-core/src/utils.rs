//! Shared utility functions for cpo crates

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Name of the per-user data directory below `$HOME`
pub const CLI_DATA_DIR_NAME: &str = ".cpo";

/// Environment variable overriding the CLI data directory
pub const CLI_DATA_DIR_ENV: &str = "CPO_DATA_DIR";

/// Get the user's home directory
///
/// Prefers the HOME environment variable over `dirs::home_dir()` because
/// the latter reads from the password database and ignores overrides made
/// by wrapper scripts and containers.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or(Error::HomeDirNotFound)
}

/// Get the CLI data directory hosting the version manifest and `bin/`
///
/// `CPO_DATA_DIR` takes precedence; otherwise `$HOME/.cpo` is used.
/// The directory is not created here.
pub fn cli_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CLI_DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    Ok(get_home_dir()?.join(CLI_DATA_DIR_NAME))
}
