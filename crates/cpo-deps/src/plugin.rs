//! Dependency plugin protocol
//!
//! A [`Plugin`] knows how to discover and download one external dependency.
//! A [`BinaryPlugin`] additionally provides an executable with a versioned
//! on-disk layout:
//!
//! - subdirectory layout: `<bin-dir>/<alias>-<version>/<binary><ext>`
//! - flat layout: `<bin-dir>/<binary>-<version><ext>`

use crate::download::Downloader;
use crate::error::Result;
use crate::platform::Platform;
use crate::process::{self, ExecOptions, ProcessResult};
use crate::version::{DependencyVersion, SemanticVersion};
use async_trait::async_trait;
use cpo_core::RuntimeConfig;
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared state handed to plugins when they are constructed
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Directory holding versioned binaries
    pub bin_dir: PathBuf,

    /// Platform artifacts are selected for
    pub platform: Platform,

    /// HTTP downloader
    pub downloader: Arc<Downloader>,

    /// Runtime configuration (mirrors, GitHub API)
    pub config: Arc<RuntimeConfig>,
}

/// A dependency the manager can discover and install
#[async_trait]
pub trait Plugin: Any + Send + Sync {
    /// Stable manifest key (e.g., "oc")
    fn alias(&self) -> &str;

    /// Human-readable name for diagnostics
    fn display_name(&self) -> &str;

    /// Whether an artifact is published for `platform`
    fn supports(&self, platform: Platform) -> bool;

    /// Latest version published upstream
    async fn latest_upstream_version(&self) -> Result<DependencyVersion>;

    /// Fetch and install `version` for the current platform
    async fn download(&self, version: &DependencyVersion) -> Result<()>;

    /// Binary capabilities, when this plugin provides an executable
    fn as_binary(&self) -> Option<&dyn BinaryPlugin> {
        None
    }

    /// Rust type name, used in lookup diagnostics
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A plugin providing an executable binary
#[async_trait]
pub trait BinaryPlugin: Plugin {
    /// Executable name without extension (e.g., "oc")
    fn binary_name(&self) -> &str;

    /// Whether each version lives in its own `<alias>-<version>` directory
    fn is_located_in_subdirectory(&self) -> bool;

    fn bin_dir(&self) -> &Path;

    fn platform(&self) -> Platform;

    /// Path of the binary for `version`; never touches the filesystem
    fn binary_path(&self, version: &SemanticVersion) -> PathBuf {
        binary_layout_path(
            self.bin_dir(),
            self.alias(),
            self.binary_name(),
            version,
            self.is_located_in_subdirectory(),
            self.platform(),
        )
    }

    /// Where an older release of this CLI placed the binary for `version`
    fn legacy_binary_path(&self, _version: &SemanticVersion) -> Option<PathBuf> {
        None
    }

    /// Run the binary for `version`
    async fn execute(
        &self,
        version: &SemanticVersion,
        args: &[String],
        env: &HashMap<String, String>,
        options: ExecOptions,
    ) -> Result<ProcessResult> {
        process::execute(self.binary_path(version), args, env, options).await
    }
}

/// A plugin the registry can build from a [`PluginContext`]
pub trait PluginConstructor: Plugin + Sized {
    fn construct(context: &PluginContext) -> Result<Self>;
}

/// Compute the versioned location of a binary
pub fn binary_layout_path(
    bin_dir: &Path,
    alias: &str,
    binary_name: &str,
    version: &SemanticVersion,
    located_in_subdirectory: bool,
    platform: Platform,
) -> PathBuf {
    let extension = platform.executable_extension();

    if located_in_subdirectory {
        bin_dir
            .join(format!("{}-{}", alias, version))
            .join(format!("{}{}", binary_name, extension))
    } else {
        bin_dir.join(format!("{}-{}{}", binary_name, version, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_layout() {
        let path = binary_layout_path(
            Path::new("/home/u/.cpo/bin"),
            "oc",
            "oc",
            &SemanticVersion::new(4, 15, 3),
            false,
            Platform::LinuxX86_64,
        );
        assert_eq!(path, PathBuf::from("/home/u/.cpo/bin/oc-4.15.3"));
    }

    #[test]
    fn test_flat_layout_windows() {
        let path = binary_layout_path(
            Path::new("bin"),
            "oc",
            "oc",
            &SemanticVersion::new(4, 15, 3),
            false,
            Platform::Windows,
        );
        assert_eq!(path, Path::new("bin").join("oc-4.15.3.exe"));
    }

    #[test]
    fn test_subdirectory_layout() {
        let version = SemanticVersion::new(1, 2, 3);
        let path = binary_layout_path(Path::new("bin"), "foo", "foo", &version, true, Platform::MacOs);
        assert_eq!(path, Path::new("bin").join("foo-1.2.3").join("foo"));

        let path =
            binary_layout_path(Path::new("bin"), "foo", "foo", &version, true, Platform::Windows);
        assert_eq!(path, Path::new("bin").join("foo-1.2.3").join("foo.exe"));
    }
}
