//! Upstream version discovery
//!
//! Dependencies publish their releases either through the GitHub Releases
//! API (newest first, so the first entry is the latest) or through a mirror
//! directory holding a plain-text `release.txt` / `VERSIONS.txt`.

use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::version::DependencyVersion;
use cpo_core::types::GitHubConfig;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::debug;

/// GitHub release as returned by `/repos/{owner}/{repo}/releases`
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Release tag (e.g., "v2.20.0")
    pub tag_name: String,

    /// Release name
    pub name: Option<String>,

    /// Release assets
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Release asset
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Asset name
    pub name: String,

    /// Download URL
    pub browser_download_url: String,
}

impl Release {
    /// Version text of this release: its name, or the tag when unnamed
    pub fn version_text(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.tag_name)
    }
}

/// Where the latest version of a dependency is published
#[derive(Debug, Clone)]
pub enum VersionSource {
    /// GitHub Releases of `owner/repo`
    GitHubReleases { owner: String, repo: String },

    /// Plain-text versions file; capture group 1 of `pattern` holds the version
    Mirror { url: String, pattern: String },
}

impl VersionSource {
    pub fn github(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::GitHubReleases {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn mirror(url: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Mirror {
            url: url.into(),
            pattern: pattern.into(),
        }
    }

    /// Query the latest upstream version
    pub async fn latest_version(
        &self,
        downloader: &Downloader,
        github: &GitHubConfig,
    ) -> Result<DependencyVersion> {
        match self {
            Self::GitHubReleases { owner, repo } => {
                let releases = list_releases(downloader, github, owner, repo).await?;
                let latest = releases.first().ok_or_else(|| {
                    Error::parse(format!("No releases published for {}/{}", owner, repo))
                })?;
                DependencyVersion::parse(latest.version_text())
            }
            Self::Mirror { url, pattern } => {
                debug!("Fetching versions file from: {}", url);
                let content = downloader.fetch_text(url, HeaderMap::new()).await?;
                parse_versions_file(&content, pattern)
            }
        }
    }
}

/// List releases of `owner/repo`, newest first
pub async fn list_releases(
    downloader: &Downloader,
    github: &GitHubConfig,
    owner: &str,
    repo: &str,
) -> Result<Vec<Release>> {
    let url = format!(
        "{}/repos/{}/{}/releases",
        github.api_url.trim_end_matches('/'),
        owner,
        repo
    );

    debug!("Fetching releases from: {}", url);

    let body = downloader.fetch_text(&url, github_headers(github)).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Headers for GitHub API requests, with a bearer token when one is configured
pub fn github_headers(github: &GitHubConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

    if let Some(token) = github.token.as_deref().filter(|t| !t.is_empty()) {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => debug!("Ignoring GitHub token containing invalid header characters"),
        }
    }

    headers
}

/// Extract the first version matched by `pattern` from a versions file
pub fn parse_versions_file(content: &str, pattern: &str) -> Result<DependencyVersion> {
    let regex = Regex::new(pattern)
        .map_err(|e| Error::parse(format!("Invalid version pattern {:?}: {}", pattern, e)))?;

    let captures = regex
        .captures(content)
        .ok_or_else(|| Error::parse(format!("No version matching {:?} found", pattern)))?;
    let version = captures
        .get(1)
        .ok_or_else(|| Error::parse(format!("Version pattern {:?} has no capture group", pattern)))?;

    DependencyVersion::parse(version.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::SemanticVersion;

    const RELEASE_TXT: &str = "Client tools for OpenShift\n\
        ---------------------------\n\
        \n\
        Name:      4.15.3\n\
        Digest:    sha256:8e8c2c6a\n\
        Created:   2024-03-13T00:00:00Z\n\
        \n\
        Version:  4.15.3\n\
        Pull From: quay.io/openshift-release-dev/ocp-release\n";

    #[test]
    fn test_parse_versions_file() {
        let version = parse_versions_file(RELEASE_TXT, r"Version:\s+(\d+\.\d+\.\d+)").unwrap();
        assert_eq!(version.version, SemanticVersion::new(4, 15, 3));
    }

    #[test]
    fn test_parse_versions_file_without_match() {
        let err = parse_versions_file("nothing here", r"Version:\s+(\d+\.\d+\.\d+)").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_parse_versions_file_without_capture_group() {
        let err = parse_versions_file(RELEASE_TXT, r"Version:").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_release_version_text_falls_back_to_tag() {
        let release: Release =
            serde_json::from_str(r#"{"tag_name": "v2.20.0", "name": "", "assets": []}"#).unwrap();
        assert_eq!(release.version_text(), "v2.20.0");

        let release: Release = serde_json::from_str(r#"{"tag_name": "x", "name": "v1.02.3"}"#).unwrap();
        assert_eq!(release.version_text(), "v1.02.3");
    }

    #[test]
    fn test_github_headers_with_token() {
        let config = GitHubConfig {
            token: Some("secret".to_string()),
            ..GitHubConfig::default()
        };
        let headers = github_headers(&config);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");

        let headers = github_headers(&GitHubConfig::default());
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
