//! Dependency version parsing and comparison
//!
//! Upstream projects publish versions such as `v2.20.0` or `v1.02.3`.
//! Leading zeros are stripped per component for comparison while the
//! original text is kept so download URLs can be rebuilt verbatim.

use crate::error::{Error, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Semantic version triple used for ordering and manifest entries
pub type SemanticVersion = semver::Version;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)$").expect("version pattern is valid")
    })
}

/// Parse `[v]N.N.N`, stripping leading zeros in each component
pub fn parse_semantic_version(text: &str) -> Result<SemanticVersion> {
    let trimmed = text.trim();
    let captures = version_pattern()
        .captures(trimmed)
        .ok_or_else(|| Error::parse(format!("Invalid version format: {:?}", text)))?;

    let component = |index: usize| -> Result<u64> {
        captures[index]
            .parse::<u64>()
            .map_err(|_| Error::parse(format!("Version component out of range: {:?}", text)))
    };

    Ok(SemanticVersion::new(component(1)?, component(2)?, component(3)?))
}

/// A semantic version plus the textual form it was parsed from
#[derive(Debug, Clone)]
pub struct DependencyVersion {
    /// Version used for ordering and the manifest
    pub version: SemanticVersion,

    /// Upstream spelling, e.g. `v1.02.3`
    pub original: Option<String>,
}

impl DependencyVersion {
    /// Wrap a semantic version without an upstream spelling
    pub fn new(version: SemanticVersion) -> Self {
        Self {
            version,
            original: None,
        }
    }

    /// Parse an upstream version string, keeping its original spelling
    pub fn parse(text: &str) -> Result<Self> {
        let version = parse_semantic_version(text)?;
        Ok(Self {
            version,
            original: Some(text.trim().to_string()),
        })
    }

    /// Upstream spelling verbatim, or the semantic version when none was recorded
    pub fn tag(&self) -> String {
        self.original
            .clone()
            .unwrap_or_else(|| self.version.to_string())
    }

    /// Upstream spelling without a leading `v`, zero padding preserved
    pub fn url_version(&self) -> String {
        match &self.original {
            Some(original) => original
                .strip_prefix('v')
                .unwrap_or(original.as_str())
                .to_string(),
            None => self.version.to_string(),
        }
    }
}

impl From<SemanticVersion> for DependencyVersion {
    fn from(version: SemanticVersion) -> Self {
        Self::new(version)
    }
}

impl PartialEq for DependencyVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for DependencyVersion {}

impl PartialOrd for DependencyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl fmt::Display for DependencyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

/// A version requested by a caller of the dependency manager
#[derive(Debug, Clone)]
pub enum VersionRequest {
    /// Already-parsed semantic version
    Semantic(SemanticVersion),
    /// Version text, parsed with the leading-zero stripping rule
    Text(String),
}

impl VersionRequest {
    /// Resolve the request into a dependency version
    pub fn resolve(&self) -> Result<DependencyVersion> {
        match self {
            Self::Semantic(version) => Ok(DependencyVersion::new(version.clone())),
            Self::Text(text) => DependencyVersion::parse(text),
        }
    }
}

impl From<SemanticVersion> for VersionRequest {
    fn from(version: SemanticVersion) -> Self {
        Self::Semantic(version)
    }
}

impl From<&str> for VersionRequest {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for VersionRequest {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
