//! Dependency manager
//!
//! Facade over the plugin registry, version manifest and platform probe.
//! Operations run sequentially; plugins are visited in registration order.

use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::manifest::VersionManifest;
use crate::platform::{current_platform, Platform};
use crate::plugin::{BinaryPlugin, Plugin, PluginConstructor, PluginContext};
use crate::process::{ExecOptions, ProcessResult};
use crate::registry::PluginRegistry;
use crate::version::{DependencyVersion, SemanticVersion, VersionRequest};
use cpo_core::RuntimeConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the directory holding versioned binaries
pub const BIN_DIR_NAME: &str = "bin";

/// Settings for constructing a [`DependencyManager`]
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// CLI data directory holding the manifest and `bin/`
    pub data_dir: PathBuf,

    /// Runtime configuration
    pub config: RuntimeConfig,

    /// Platform override; detected from the host when `None`
    pub platform: Option<Platform>,
}

impl ManagerSettings {
    pub fn new(data_dir: impl Into<PathBuf>, config: RuntimeConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            config,
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
}

/// A version change made by [`DependencyManager::ensure_latest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyUpdate {
    pub alias: String,
    pub previous: Option<SemanticVersion>,
    pub installed: SemanticVersion,
}

/// Install state of a registered dependency
#[derive(Debug, Clone, Serialize)]
pub struct InstalledDependency {
    pub alias: String,
    pub display_name: String,
    pub version: Option<SemanticVersion>,
    pub supported: bool,
    pub binary_path: Option<PathBuf>,
}

/// Downloads, records and dispatches versioned dependency binaries
pub struct DependencyManager {
    context: PluginContext,
    registry: PluginRegistry,
    manifest: VersionManifest,
}

impl DependencyManager {
    /// Create a manager; no plugins are registered yet
    pub fn new(settings: ManagerSettings) -> Result<Self> {
        let platform = match settings.platform {
            Some(platform) => platform,
            None => current_platform()?,
        };

        let downloader = Downloader::new(&settings.config)?;
        let context = PluginContext {
            bin_dir: settings.data_dir.join(BIN_DIR_NAME),
            platform,
            downloader: Arc::new(downloader),
            config: Arc::new(settings.config),
        };

        debug!(
            "Dependency manager for {} using {:?}",
            platform, settings.data_dir
        );

        Ok(Self {
            context,
            registry: PluginRegistry::new(),
            manifest: VersionManifest::in_data_dir(&settings.data_dir),
        })
    }

    /// Create a manager in the default CLI data directory
    pub fn from_config(config: RuntimeConfig) -> Result<Self> {
        let data_dir = cpo_core::cli_data_dir()?;
        Self::new(ManagerSettings::new(data_dir, config))
    }

    /// Context handed to plugin constructors
    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn platform(&self) -> Platform {
        self.context.platform
    }

    pub fn bin_dir(&self) -> &Path {
        &self.context.bin_dir
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn manifest_path(&self) -> &Path {
        self.manifest.path()
    }

    /// Construct and register plugin type `P`
    pub fn register<P: PluginConstructor>(&mut self) -> Result<()> {
        self.registry.register::<P>(&self.context)
    }

    /// Register a pre-built plugin
    pub fn register_instance<P: Plugin>(&mut self, plugin: P) {
        self.registry.register_instance(plugin);
    }

    /// Bring every supported dependency up to its latest upstream release
    ///
    /// Returns the updates made; empty when everything is current.
    pub async fn ensure_latest(&mut self) -> Result<Vec<DependencyUpdate>> {
        let platform = self.context.platform;
        let mut updates = Vec::new();

        for plugin in self.registry.iter() {
            if !plugin.supports(platform) {
                debug!("Skipping {}: not available for {}", plugin.alias(), platform);
                continue;
            }

            let latest = plugin.latest_upstream_version().await?;
            let recorded = self.manifest.latest_downloaded_version(plugin.alias())?;

            if let Some(recorded) = &recorded {
                if latest.version <= recorded.version {
                    debug!("{} {} is up to date", plugin.display_name(), recorded);
                    continue;
                }
            }

            info!("Installing {} {}", plugin.display_name(), latest);
            plugin.download(&latest).await?;
            self.manifest
                .set_latest_downloaded_version(plugin.alias(), &latest.version)?;

            updates.push(DependencyUpdate {
                alias: plugin.alias().to_string(),
                previous: recorded.map(|r| r.version),
                installed: latest.version,
            });
        }

        Ok(updates)
    }

    /// Installed version of `P`, downloading the latest release only when none is recorded
    pub async fn download_if_required<P: Plugin>(&mut self) -> Result<SemanticVersion> {
        let plugin: &dyn Plugin = self.registry.get::<P>()?;
        ensure_installed(plugin, &mut self.manifest, self.context.platform).await
    }

    /// [`download_if_required`](Self::download_if_required) by alias
    pub async fn download_if_required_by_alias(&mut self, alias: &str) -> Result<SemanticVersion> {
        let plugin = self.registry.get_by_alias(alias)?;
        ensure_installed(plugin, &mut self.manifest, self.context.platform).await
    }

    /// Run the binary of `P` at the requested version
    ///
    /// Without a version the recorded one is used, installing the latest
    /// release first when nothing is recorded.
    pub async fn execute<P: Plugin>(
        &mut self,
        version: Option<VersionRequest>,
        args: &[String],
        env: &HashMap<String, String>,
        options: ExecOptions,
    ) -> Result<ProcessResult> {
        let plugin: &dyn Plugin = self.registry.get::<P>()?;
        execute_plugin(
            plugin,
            &mut self.manifest,
            self.context.platform,
            version,
            args,
            env,
            options,
        )
        .await
    }

    /// [`execute`](Self::execute) by alias
    pub async fn execute_by_alias(
        &mut self,
        alias: &str,
        version: Option<VersionRequest>,
        args: &[String],
        env: &HashMap<String, String>,
        options: ExecOptions,
    ) -> Result<ProcessResult> {
        let plugin = self.registry.get_by_alias(alias)?;
        execute_plugin(
            plugin,
            &mut self.manifest,
            self.context.platform,
            version,
            args,
            env,
            options,
        )
        .await
    }

    /// Path of the binary of `P` at `version`; no I/O
    pub fn binary_path<P: Plugin>(&self, version: &SemanticVersion) -> Result<PathBuf> {
        let plugin: &dyn Plugin = self.registry.get::<P>()?;
        Ok(as_binary(plugin)?.binary_path(version))
    }

    /// [`binary_path`](Self::binary_path) by alias
    pub fn binary_path_by_alias(&self, alias: &str, version: &SemanticVersion) -> Result<PathBuf> {
        let plugin = self.registry.get_by_alias(alias)?;
        Ok(as_binary(plugin)?.binary_path(version))
    }

    /// Install state of every registered plugin, in registration order
    pub fn installed(&mut self) -> Result<Vec<InstalledDependency>> {
        let platform = self.context.platform;
        let mut installed = Vec::new();

        for plugin in self.registry.iter() {
            let version = self
                .manifest
                .latest_downloaded_version(plugin.alias())?
                .map(|v| v.version);
            let binary_path = match (&version, plugin.as_binary()) {
                (Some(version), Some(binary)) => Some(binary.binary_path(version)),
                _ => None,
            };

            installed.push(InstalledDependency {
                alias: plugin.alias().to_string(),
                display_name: plugin.display_name().to_string(),
                version,
                supported: plugin.supports(platform),
                binary_path,
            });
        }

        Ok(installed)
    }
}

fn as_binary(plugin: &dyn Plugin) -> Result<&dyn BinaryPlugin> {
    plugin.as_binary().ok_or_else(|| Error::NotABinaryPlugin {
        alias: plugin.alias().to_string(),
    })
}

fn check_supported(plugin: &dyn Plugin, platform: Platform) -> Result<()> {
    if plugin.supports(platform) {
        Ok(())
    } else {
        debug!("{} is not published for {}", plugin.alias(), platform);
        Err(Error::UnsupportedPlatform {
            os: platform.tag().to_string(),
            arch: std::env::consts::ARCH.to_string(),
        })
    }
}

/// Recorded version of `plugin`, installing the latest release when none is recorded
async fn ensure_installed(
    plugin: &dyn Plugin,
    manifest: &mut VersionManifest,
    platform: Platform,
) -> Result<SemanticVersion> {
    check_supported(plugin, platform)?;

    if let Some(recorded) = manifest.latest_downloaded_version(plugin.alias())? {
        if let Some(binary) = plugin.as_binary() {
            ensure_binary_present(plugin, binary, &recorded, SpellingSource::Upstream).await?;
        }
        return Ok(recorded.version);
    }

    let latest = plugin.latest_upstream_version().await?;
    info!("Installing {} {}", plugin.display_name(), latest);
    plugin.download(&latest).await?;
    manifest.set_latest_downloaded_version(plugin.alias(), &latest.version)?;

    Ok(latest.version)
}

async fn execute_plugin(
    plugin: &dyn Plugin,
    manifest: &mut VersionManifest,
    platform: Platform,
    request: Option<VersionRequest>,
    args: &[String],
    env: &HashMap<String, String>,
    options: ExecOptions,
) -> Result<ProcessResult> {
    let binary = as_binary(plugin)?;

    let version = match request {
        None => ensure_installed(plugin, manifest, platform).await?,
        Some(request) => {
            check_supported(plugin, platform)?;
            let requested = request.resolve()?;

            if ensure_binary_present(plugin, binary, &requested, SpellingSource::Requested).await? {
                let recorded = manifest.latest_downloaded_version(plugin.alias())?;
                if recorded.is_none_or(|recorded| requested.version > recorded.version) {
                    manifest.set_latest_downloaded_version(plugin.alias(), &requested.version)?;
                }
            }

            requested.version
        }
    };

    binary.execute(&version, args, env, options).await
}

/// Where the textual form of a version passed to a download comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpellingSource {
    /// Caller-supplied text, used verbatim
    Requested,
    /// Manifest entry; the manifest only keeps the normalized version
    Upstream,
}

/// Make sure the binary for `version` exists, migrating or downloading it
///
/// Returns `true` when a download was performed.
async fn ensure_binary_present(
    plugin: &dyn Plugin,
    binary: &dyn BinaryPlugin,
    version: &DependencyVersion,
    spelling: SpellingSource,
) -> Result<bool> {
    let path = binary.binary_path(&version.version);
    if path.is_file() {
        return Ok(false);
    }

    if migrate_legacy_binary(binary, &version.version, &path)? {
        return Ok(false);
    }

    info!(
        "{} {} not found at {:?}, downloading",
        plugin.display_name(),
        version,
        path
    );

    let download_version = match spelling {
        SpellingSource::Requested => version.clone(),
        SpellingSource::Upstream => upstream_spelling(plugin, version).await,
    };
    plugin.download(&download_version).await?;
    Ok(true)
}

/// The upstream spelling of `version` (e.g. `v1.02.3`) while it is still the latest release
///
/// Older releases and failed lookups fall back to the normalized version.
async fn upstream_spelling(plugin: &dyn Plugin, version: &DependencyVersion) -> DependencyVersion {
    match plugin.latest_upstream_version().await {
        Ok(latest) if latest.version == version.version => latest,
        Ok(latest) => {
            debug!(
                "{} upstream is at {}, downloading {} by its normalized version",
                plugin.alias(),
                latest,
                version
            );
            version.clone()
        }
        Err(err) => {
            warn!(
                "Could not look up upstream spelling of {} {}: {}",
                plugin.alias(),
                version,
                err
            );
            version.clone()
        }
    }
}

/// Move a binary from its legacy location to `target`
fn migrate_legacy_binary(
    binary: &dyn BinaryPlugin,
    version: &SemanticVersion,
    target: &Path,
) -> Result<bool> {
    let Some(legacy) = binary.legacy_binary_path(version) else {
        return Ok(false);
    };
    if !legacy.is_file() {
        return Ok(false);
    }

    info!("Migrating {:?} to {:?}", legacy, target);

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if target.is_dir() {
        // legacy directory occupies the target name
        let staging = target.with_file_name(format!(
            ".{}.migrating",
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));
        std::fs::rename(&legacy, &staging)?;
        std::fs::remove_dir_all(target)?;
        std::fs::rename(&staging, target)?;
    } else {
        std::fs::rename(&legacy, target)?;
        if let Some(legacy_dir) = legacy.parent() {
            // only succeeds once the directory is empty
            let _ = std::fs::remove_dir(legacy_dir);
        }
    }

    Ok(true)
}
