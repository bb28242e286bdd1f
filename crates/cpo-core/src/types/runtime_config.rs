//! Runtime configuration types for operational parameters
//!
//! These types control network timeouts, upstream endpoints used to
//! discover and download dependencies, and terminal output behavior.

use serde::{Deserialize, Serialize};

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Download mirrors for dependency artifacts
    #[serde(default)]
    pub mirrors: MirrorConfig,

    /// Display and output settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// HTTP timeout in seconds for API requests
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Download chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub download_chunk_size: usize,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            download_chunk_size: default_chunk_size(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    300 // 5 minutes
}
fn default_download_timeout() -> u64 {
    600 // 10 minutes
}
fn default_chunk_size() -> usize {
    1024 * 1024 // 1 MB
}
fn default_user_agent() -> String {
    format!(
        "cpo/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// GitHub API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// Base URL of the GitHub REST API
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Optional token sent as a bearer credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token: None,
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Download mirrors for dependency artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MirrorConfig {
    /// OpenShift client mirror (hosts `stable/release.txt` and per-version directories)
    #[serde(default = "default_openshift_mirror")]
    pub openshift: String,

    /// IBM Cloud CLI binary download base URL
    #[serde(default = "default_ibmcloud_mirror")]
    pub ibmcloud: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            openshift: default_openshift_mirror(),
            ibmcloud: default_ibmcloud_mirror(),
        }
    }
}

fn default_openshift_mirror() -> String {
    "https://mirror.openshift.com/pub/openshift-v4/clients/ocp".to_string()
}
fn default_ibmcloud_mirror() -> String {
    "https://download.clis.cloud.ibm.com/ibm-cloud-cli".to_string()
}

/// Display and output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Show download progress bars
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { progress: true }
    }
}

fn default_true() -> bool {
    true
}
