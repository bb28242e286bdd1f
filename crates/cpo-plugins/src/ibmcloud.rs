//! IBM Cloud CLI (`ibmcloud`)
//!
//! Releases are listed on GitHub (`IBM-Cloud/ibm-cloud-cli-release`, release
//! names such as `v2.20.0`); archives are served from the IBM download site.
//! The binary ships with companion files, so each version keeps its own
//! directory: `<bin-dir>/ibmcloud-2.20.0/ibmcloud`.

use crate::archived::{ArchivedBinary, BinaryDefinition, Definition};
use cpo_core::RuntimeConfig;
use cpo_deps::{Platform, VersionSource};
use std::collections::BTreeMap;

pub const RELEASE_REPO_OWNER: &str = "IBM-Cloud";
pub const RELEASE_REPO_NAME: &str = "ibm-cloud-cli-release";

pub struct IbmCloudCliDefinition;

impl Definition for IbmCloudCliDefinition {
    fn definition(config: &RuntimeConfig) -> BinaryDefinition {
        BinaryDefinition {
            alias: "ibmcloud",
            display_name: "IBM Cloud CLI",
            binary_name: "ibmcloud",
            url_template: format!(
                "{}/{{version}}/binaries/IBM_Cloud_CLI_{{version}}_{{artifact}}",
                config.mirrors.ibmcloud.trim_end_matches('/')
            ),
            artifacts: BTreeMap::from([
                (Platform::LinuxX86_64, "linux_amd64.tgz"),
                (Platform::MacOs, "macos.tgz"),
                (Platform::Windows, "windows_amd64.zip"),
            ]),
            version_source: VersionSource::github(RELEASE_REPO_OWNER, RELEASE_REPO_NAME),
            located_in_subdirectory: true,
            start_directory: Some("IBM_Cloud_CLI"),
            legacy_subdirectory: false,
        }
    }
}

pub type IbmCloudCli = ArchivedBinary<IbmCloudCliDefinition>;

#[cfg(test)]
mod tests {
    use super::*;
    use cpo_deps::DependencyVersion;

    #[test]
    fn test_artifact_url_uses_version_without_prefix() {
        let definition = IbmCloudCliDefinition::definition(&RuntimeConfig::default());
        let version = DependencyVersion::parse("v2.20.0").unwrap();

        assert_eq!(
            definition
                .artifact_url(&version, Platform::LinuxX86_64)
                .unwrap(),
            "https://download.clis.cloud.ibm.com/ibm-cloud-cli/2.20.0/binaries/IBM_Cloud_CLI_2.20.0_linux_amd64.tgz"
        );
    }

    #[test]
    fn test_supported_everywhere() {
        let definition = IbmCloudCliDefinition::definition(&RuntimeConfig::default());
        for platform in Platform::ALL {
            assert!(definition.artifacts.contains_key(&platform));
        }
    }
}
