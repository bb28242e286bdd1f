//! OpenShift CLI (`oc`) and installer (`openshift-install`)
//!
//! Both are published on the OpenShift client mirror. The latest stable
//! version is read from `stable/release.txt`:
//!
//! ```text
//! Name:      4.15.3
//! Version:  4.15.3
//! ```
//!
//! Binaries use the flat layout (`<bin-dir>/oc-4.15.3`). Earlier releases of
//! this CLI kept `oc` in `<bin-dir>/oc-<version>/oc`; such binaries are moved
//! into place instead of being downloaded again.

use crate::archived::{ArchivedBinary, BinaryDefinition, Definition};
use cpo_core::RuntimeConfig;
use cpo_deps::{Platform, VersionSource};
use std::collections::BTreeMap;

/// Pattern matching the version line of the mirror's `release.txt`
pub const RELEASE_VERSION_PATTERN: &str = r"Version:\s+(\d+\.\d+\.\d+)";

fn stable_release_source(config: &RuntimeConfig) -> VersionSource {
    VersionSource::mirror(
        format!(
            "{}/stable/release.txt",
            config.mirrors.openshift.trim_end_matches('/')
        ),
        RELEASE_VERSION_PATTERN,
    )
}

fn artifact_url_template(config: &RuntimeConfig, artifact_prefix: &str) -> String {
    format!(
        "{}/{{version}}/{}-{{artifact}}",
        config.mirrors.openshift.trim_end_matches('/'),
        artifact_prefix
    )
}

/// OpenShift command-line client
pub struct OpenShiftCliDefinition;

impl Definition for OpenShiftCliDefinition {
    fn definition(config: &RuntimeConfig) -> BinaryDefinition {
        BinaryDefinition {
            alias: "oc",
            display_name: "OpenShift CLI",
            binary_name: "oc",
            url_template: artifact_url_template(config, "openshift-client"),
            artifacts: BTreeMap::from([
                (Platform::LinuxX86_64, "linux.tar.gz"),
                (Platform::MacOs, "mac.tar.gz"),
                (Platform::Windows, "windows.zip"),
            ]),
            version_source: stable_release_source(config),
            located_in_subdirectory: false,
            start_directory: None,
            legacy_subdirectory: true,
        }
    }
}

pub type OpenShiftCli = ArchivedBinary<OpenShiftCliDefinition>;

/// OpenShift installer; not published for Windows
pub struct OpenShiftInstallDefinition;

impl Definition for OpenShiftInstallDefinition {
    fn definition(config: &RuntimeConfig) -> BinaryDefinition {
        BinaryDefinition {
            alias: "openshift-install",
            display_name: "OpenShift Installer",
            binary_name: "openshift-install",
            url_template: artifact_url_template(config, "openshift-install"),
            artifacts: BTreeMap::from([
                (Platform::LinuxX86_64, "linux.tar.gz"),
                (Platform::MacOs, "mac.tar.gz"),
            ]),
            version_source: stable_release_source(config),
            located_in_subdirectory: false,
            start_directory: None,
            legacy_subdirectory: false,
        }
    }
}

pub type OpenShiftInstall = ArchivedBinary<OpenShiftInstallDefinition>;
