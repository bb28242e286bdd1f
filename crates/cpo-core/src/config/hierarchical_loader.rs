//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User config (~/.cpo/config.yaml)
//! 3. Environment variables (CPO_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::RuntimeConfig;
use crate::utils::cli_data_dir;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// User configuration file name inside the data directory
const USER_CONFIG_FILE: &str = "config.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at the CLI data directory
    pub fn new() -> Result<Self> {
        let dir = cli_data_dir()?;
        let config_dir = Utf8PathBuf::from_path_buf(dir).map_err(|p| {
            Error::invalid_config(format!("Data directory is not valid UTF-8: {:?}", p))
        })?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = Self::load_embedded_config::<RuntimeConfig>("runtime-defaults.yaml")?;

        let user_config_path = self.config_dir.join(USER_CONFIG_FILE);
        if user_config_path.exists() {
            debug!("Loading user configuration from {}", user_config_path);
            let file_config = self.load_yaml_file::<RuntimeConfig>(&user_config_path)?;
            config = Self::merge_runtime_config(config, file_config);
        }

        Self::apply_env_overrides(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Merge two runtime configs (base is overridden by overlay)
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            network: overlay.network,
            github: crate::types::GitHubConfig {
                token: overlay.github.token.or(base.github.token),
                ..overlay.github
            },
            mirrors: overlay.mirrors,
            display: overlay.display,
        }
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Ok(val) = env::var("CPO_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("CPO_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CPO_DOWNLOAD_TIMEOUT_SECS") {
            config.network.download_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("CPO_DOWNLOAD_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CPO_DOWNLOAD_CHUNK_SIZE") {
            config.network.download_chunk_size = val.parse().map_err(|_| {
                Error::invalid_config("CPO_DOWNLOAD_CHUNK_SIZE must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CPO_GITHUB_API_URL") {
            config.github.api_url = val;
        }

        if let Ok(val) = env::var("CPO_GITHUB_TOKEN").or_else(|_| env::var("GITHUB_TOKEN")) {
            if !val.is_empty() {
                config.github.token = Some(val);
            }
        }

        if let Ok(val) = env::var("CPO_OPENSHIFT_MIRROR_URL") {
            config.mirrors.openshift = val;
        }

        if let Ok(val) = env::var("CPO_IBMCLOUD_DOWNLOAD_URL") {
            config.mirrors.ibmcloud = val;
        }

        if let Ok(val) = env::var("CPO_NO_PROGRESS") {
            config.display.progress = !val.parse().unwrap_or(false);
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
