//! Fake plugins for exercising the dependency manager without a network

use async_trait::async_trait;
use cpo_deps::{
    make_executable, BinaryPlugin, DependencyVersion, Error, Platform, Plugin, PluginConstructor,
    PluginContext, Result,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared, inspectable state of a [`FakeTool`]
#[derive(Debug, Default)]
pub struct FakeState {
    /// Version reported as latest upstream
    pub upstream: Option<String>,

    /// HTTP status to fail upstream queries with
    pub upstream_failure: Option<u16>,

    /// Versions passed to `download`, as their upstream spelling
    pub downloads: Vec<String>,
}

pub type SharedState = Arc<Mutex<FakeState>>;

pub fn shared_state(upstream: &str) -> SharedState {
    Arc::new(Mutex::new(FakeState {
        upstream: Some(upstream.to_string()),
        ..FakeState::default()
    }))
}

pub fn set_upstream(state: &SharedState, version: &str) {
    state.lock().unwrap().upstream = Some(version.to_string());
}

pub fn downloads(state: &SharedState) -> Vec<String> {
    state.lock().unwrap().downloads.clone()
}

/// Binary plugin whose "download" writes a shell script echoing its version
pub struct FakeTool {
    pub alias: &'static str,
    pub subdirectory: bool,
    pub platforms: Vec<Platform>,
    pub legacy_subdirectory: bool,
    pub bin_dir: PathBuf,
    pub platform: Platform,
    pub state: SharedState,
}

impl FakeTool {
    pub fn new(alias: &'static str, context: &PluginContext, state: SharedState) -> Self {
        Self {
            alias,
            subdirectory: false,
            platforms: Platform::ALL.to_vec(),
            legacy_subdirectory: false,
            bin_dir: context.bin_dir.clone(),
            platform: context.platform,
            state,
        }
    }

    pub fn in_subdirectory(mut self) -> Self {
        self.subdirectory = true;
        self
    }

    pub fn with_legacy_subdirectory(mut self) -> Self {
        self.legacy_subdirectory = true;
        self
    }

    pub fn only_on(mut self, platforms: &[Platform]) -> Self {
        self.platforms = platforms.to_vec();
        self
    }
}

/// Script written in place of a real binary
pub fn fake_binary_script(alias: &str, version: &str) -> String {
    format!("#!/bin/sh\necho \"{} {}\"\nfor arg in \"$@\"; do echo \"$arg\"; done\n", alias, version)
}

fn write_script(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    make_executable(path)
}

#[async_trait]
impl Plugin for FakeTool {
    fn alias(&self) -> &str {
        self.alias
    }

    fn display_name(&self) -> &str {
        "Fake Tool"
    }

    fn supports(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    async fn latest_upstream_version(&self) -> Result<DependencyVersion> {
        let state = self.state.lock().unwrap();
        if let Some(status) = state.upstream_failure {
            return Err(Error::remote_api("https://example.invalid/releases", status));
        }
        let upstream = state.upstream.clone().unwrap_or_default();
        DependencyVersion::parse(&upstream)
    }

    async fn download(&self, version: &DependencyVersion) -> Result<()> {
        self.state.lock().unwrap().downloads.push(version.tag());
        let path = self.binary_path(&version.version);
        write_script(&path, &fake_binary_script(self.alias, &version.to_string()))
    }

    fn as_binary(&self) -> Option<&dyn BinaryPlugin> {
        Some(self)
    }
}

impl BinaryPlugin for FakeTool {
    fn binary_name(&self) -> &str {
        self.alias
    }

    fn is_located_in_subdirectory(&self) -> bool {
        self.subdirectory
    }

    fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn legacy_binary_path(&self, version: &cpo_deps::SemanticVersion) -> Option<PathBuf> {
        self.legacy_subdirectory.then(|| {
            self.bin_dir
                .join(format!("{}-{}", self.alias, version))
                .join(self.alias)
        })
    }
}

/// Plugin without a binary, e.g. a data bundle
pub struct FakeBundle {
    pub state: SharedState,
}

#[async_trait]
impl Plugin for FakeBundle {
    fn alias(&self) -> &str {
        "bundle"
    }

    fn display_name(&self) -> &str {
        "Fake Bundle"
    }

    fn supports(&self, _platform: Platform) -> bool {
        true
    }

    async fn latest_upstream_version(&self) -> Result<DependencyVersion> {
        let upstream = self.state.lock().unwrap().upstream.clone().unwrap_or_default();
        DependencyVersion::parse(&upstream)
    }

    async fn download(&self, version: &DependencyVersion) -> Result<()> {
        self.state.lock().unwrap().downloads.push(version.tag());
        Ok(())
    }
}

/// Plugin registered by type through [`PluginConstructor`]
pub struct ConstructedTool {
    pub bin_dir: PathBuf,
    pub platform: Platform,
}

impl PluginConstructor for ConstructedTool {
    fn construct(context: &PluginContext) -> Result<Self> {
        Ok(Self {
            bin_dir: context.bin_dir.clone(),
            platform: context.platform,
        })
    }
}

#[async_trait]
impl Plugin for ConstructedTool {
    fn alias(&self) -> &str {
        "constructed"
    }

    fn display_name(&self) -> &str {
        "Constructed Tool"
    }

    fn supports(&self, _platform: Platform) -> bool {
        true
    }

    async fn latest_upstream_version(&self) -> Result<DependencyVersion> {
        DependencyVersion::parse("v3.0.1")
    }

    async fn download(&self, version: &DependencyVersion) -> Result<()> {
        write_script(
            &self.binary_path(&version.version),
            &fake_binary_script("constructed", &version.to_string()),
        )
    }

    fn as_binary(&self) -> Option<&dyn BinaryPlugin> {
        Some(self)
    }
}

impl BinaryPlugin for ConstructedTool {
    fn binary_name(&self) -> &str {
        "constructed"
    }

    fn is_located_in_subdirectory(&self) -> bool {
        true
    }

    fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}
