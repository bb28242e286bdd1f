//! Dependency manager for the cpo CLI
//!
//! Provides:
//! - Upstream version discovery (GitHub Releases, mirror version files)
//! - Streaming downloads with progress tracking
//! - Archive extraction with member selection and flattening
//! - A manifest of the latest installed version per dependency
//! - Per-version binary layout and dispatch
//! - Child process execution with concurrent output capture

pub mod archive;
pub mod download;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod platform;
pub mod plugin;
pub mod process;
pub mod registry;
pub mod upstream;
pub mod version;

pub use archive::{extract, make_executable, ExtractOptions, MemberKind};
pub use download::{BasicAuth, Downloader};
pub use error::{Error, Result};
pub use manager::{DependencyManager, DependencyUpdate, InstalledDependency, ManagerSettings};
pub use manifest::VersionManifest;
pub use platform::{current_platform, Platform};
pub use plugin::{binary_layout_path, BinaryPlugin, Plugin, PluginConstructor, PluginContext};
pub use process::{ExecOptions, ProcessResult};
pub use registry::PluginRegistry;
pub use upstream::VersionSource;
pub use version::{
    parse_semantic_version, DependencyVersion, SemanticVersion, VersionRequest,
};
