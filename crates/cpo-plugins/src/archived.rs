//! Generic plugin for binaries published as platform-specific archives
//!
//! Each concrete dependency is a [`BinaryDefinition`] record: an alias, a URL
//! template, a platform → artifact table, a version source and a layout.
//! [`ArchivedBinary`] turns a definition into a [`BinaryPlugin`]; the type
//! parameter keeps every dependency a distinct plugin type in the registry.

use async_trait::async_trait;
use cpo_core::RuntimeConfig;
use cpo_deps::archive::{extract, make_executable, ExtractOptions, MemberKind};
use cpo_deps::{
    BinaryPlugin, DependencyVersion, Error, Platform, Plugin, PluginConstructor, PluginContext,
    Result, SemanticVersion, VersionSource,
};
use reqwest::header::HeaderMap;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where and how a dependency's binary is published
#[derive(Debug, Clone)]
pub struct BinaryDefinition {
    /// Manifest key
    pub alias: &'static str,

    pub display_name: &'static str,

    /// Executable name without extension
    pub binary_name: &'static str,

    /// Artifact URL; `{version}`, `{tag}` and `{artifact}` are substituted
    pub url_template: String,

    /// Artifact file name fragment per supported platform
    pub artifacts: BTreeMap<Platform, &'static str>,

    /// Upstream version discovery
    pub version_source: VersionSource,

    /// Keep each version in `<alias>-<version>/` instead of renaming the binary
    pub located_in_subdirectory: bool,

    /// Archive directory (regex) whose contents are extracted, prefix stripped
    pub start_directory: Option<&'static str>,

    /// Older releases kept this flat-layout binary in `<alias>-<version>/`
    pub legacy_subdirectory: bool,
}

impl BinaryDefinition {
    /// Artifact URL of `version` for `platform`
    pub fn artifact_url(&self, version: &DependencyVersion, platform: Platform) -> Result<String> {
        let artifact = self
            .artifacts
            .get(&platform)
            .ok_or_else(|| Error::UnsupportedPlatform {
                os: platform.tag().to_string(),
                arch: std::env::consts::ARCH.to_string(),
            })?;

        Ok(self
            .url_template
            .replace("{version}", &version.url_version())
            .replace("{tag}", &version.tag())
            .replace("{artifact}", artifact))
    }
}

/// Supplies the [`BinaryDefinition`] of one dependency
pub trait Definition: Send + Sync + 'static {
    fn definition(config: &RuntimeConfig) -> BinaryDefinition;
}

/// Plugin downloading and unpacking an archived binary
pub struct ArchivedBinary<D: Definition> {
    definition: BinaryDefinition,
    context: PluginContext,
    _definition: PhantomData<fn() -> D>,
}

impl<D: Definition> ArchivedBinary<D> {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            definition: D::definition(&context.config),
            context: context.clone(),
            _definition: PhantomData,
        }
    }

    pub fn definition(&self) -> &BinaryDefinition {
        &self.definition
    }

    fn executable_file_name(&self) -> String {
        format!(
            "{}{}",
            self.definition.binary_name,
            self.context.platform.executable_extension()
        )
    }

    /// Extract `archive` and move the result into its versioned location
    fn install(&self, archive: &Path, version: &SemanticVersion) -> Result<()> {
        let bin_dir = &self.context.bin_dir;
        std::fs::create_dir_all(bin_dir)?;

        let executable = self.executable_file_name();
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-", self.definition.alias))
            .tempdir_in(bin_dir)?;

        let destination = self.binary_path(version);
        let archive_name = archive.display().to_string();
        let missing_binary = || {
            Error::corrupt_archive(
                archive_name.clone(),
                format!("no {} executable found", executable),
            )
        };

        if self.definition.located_in_subdirectory {
            let mut options = ExtractOptions::new().with_post_extraction(|path| {
                if path.file_name().is_some_and(|name| *name == *executable) {
                    make_executable(path)?;
                }
                Ok(())
            });
            if let Some(start) = self.definition.start_directory {
                options = options.with_start_directory(start)?;
            }
            extract(archive, staging.path(), &options)?;

            if !staging.path().join(&executable).is_file() {
                return Err(missing_binary());
            }

            let version_dir = destination.parent().unwrap_or(bin_dir);
            replace_path(version_dir)?;
            std::fs::rename(staging.path(), version_dir)?;
            // the staging directory now lives on as the version directory
            let _ = staging.keep();
        } else {
            let options = ExtractOptions::new()
                .ignore_directory_structure(true)
                .with_member_filter(|name, kind| {
                    kind == MemberKind::RegularFile
                        && Path::new(name)
                            .file_name()
                            .is_some_and(|base| *base == *executable)
                })
                .with_post_extraction(make_executable);
            extract(archive, staging.path(), &options)?;

            let extracted = staging.path().join(&executable);
            if !extracted.is_file() {
                return Err(missing_binary());
            }

            replace_path(&destination)?;
            std::fs::rename(&extracted, &destination)?;
        }

        info!("Installed {} at {:?}", self.definition.display_name, destination);
        Ok(())
    }
}

/// Remove whatever currently occupies `path`
fn replace_path(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => std::fs::remove_dir_all(path)?,
        Ok(_) => std::fs::remove_file(path)?,
        Err(_) => {}
    }
    Ok(())
}

impl<D: Definition> PluginConstructor for ArchivedBinary<D> {
    fn construct(context: &PluginContext) -> Result<Self> {
        Ok(Self::new(context))
    }
}

#[async_trait]
impl<D: Definition> Plugin for ArchivedBinary<D> {
    fn alias(&self) -> &str {
        self.definition.alias
    }

    fn display_name(&self) -> &str {
        self.definition.display_name
    }

    fn supports(&self, platform: Platform) -> bool {
        self.definition.artifacts.contains_key(&platform)
    }

    async fn latest_upstream_version(&self) -> Result<DependencyVersion> {
        self.definition
            .version_source
            .latest_version(&self.context.downloader, &self.context.config.github)
            .await
    }

    async fn download(&self, version: &DependencyVersion) -> Result<()> {
        let url = self.definition.artifact_url(version, self.context.platform)?;
        info!("Downloading {} {}", self.definition.display_name, version);
        debug!("Artifact URL: {}", url);

        let download_dir = tempfile::tempdir()?;
        let archive = self
            .context
            .downloader
            .download_to_file(&url, HeaderMap::new(), None, Some(download_dir.path()))
            .await?;

        self.install(&archive, &version.version)
    }

    fn as_binary(&self) -> Option<&dyn BinaryPlugin> {
        Some(self)
    }
}

impl<D: Definition> BinaryPlugin for ArchivedBinary<D> {
    fn binary_name(&self) -> &str {
        self.definition.binary_name
    }

    fn is_located_in_subdirectory(&self) -> bool {
        self.definition.located_in_subdirectory
    }

    fn bin_dir(&self) -> &Path {
        &self.context.bin_dir
    }

    fn platform(&self) -> Platform {
        self.context.platform
    }

    fn legacy_binary_path(&self, version: &SemanticVersion) -> Option<PathBuf> {
        if !self.definition.legacy_subdirectory {
            return None;
        }

        Some(cpo_deps::binary_layout_path(
            &self.context.bin_dir,
            self.definition.alias,
            self.definition.binary_name,
            version,
            true,
            self.context.platform,
        ))
    }
}
