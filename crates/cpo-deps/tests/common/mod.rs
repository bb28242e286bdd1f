//! Common test infrastructure for cpo-deps tests
//!
//! # Modules
//!
//! - `fixtures`: In-memory `.tar.gz` / `.zip` archive builders
//! - `mock_server`: Wiremock setup helpers for download and version endpoints
//! - `plugins`: Scriptable fake plugins that record their downloads

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mock_server;
pub mod plugins;

pub use fixtures::*;
pub use mock_server::*;
pub use plugins::*;

use cpo_core::RuntimeConfig;
use cpo_deps::{DependencyManager, ManagerSettings, Platform};
use std::path::Path;

/// Runtime configuration with progress output disabled
pub fn quiet_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.display.progress = false;
    config
}

/// Manager rooted at `data_dir`, pinned to `platform`
pub fn manager_for(data_dir: &Path, platform: Platform) -> DependencyManager {
    let settings = ManagerSettings::new(data_dir, quiet_config()).with_platform(platform);
    DependencyManager::new(settings).unwrap()
}
