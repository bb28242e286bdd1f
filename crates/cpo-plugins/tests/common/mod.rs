//! Common test infrastructure for cpo-plugins tests
//!
//! Provides archive fixtures, a mock mirror/GitHub server and managers
//! pointed at it.

#![allow(dead_code)]

use cpo_core::RuntimeConfig;
use cpo_deps::{DependencyManager, ManagerSettings, Platform};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Write};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OCP_PREFIX: &str = "/ocp";
pub const IBM_PREFIX: &str = "/ibm";

/// Shell script standing in for a real binary
pub fn fake_binary(name: &str, version: &str) -> String {
    format!("#!/bin/sh\necho \"{} {}\"\n", name, version)
}

/// Gzip-compressed tarball of `(name, content, mode)` files
pub fn tar_gz(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(*mode);
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Zip archive of `(name, content)` files
pub fn zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Runtime configuration whose mirrors and GitHub API point at `server`
pub fn config_for(server: &MockServer) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.display.progress = false;
    config.github.api_url = server.uri();
    config.github.token = None;
    config.mirrors.openshift = format!("{}{}", server.uri(), OCP_PREFIX);
    config.mirrors.ibmcloud = format!("{}{}", server.uri(), IBM_PREFIX);
    config
}

/// Manager rooted at `data_dir`, pinned to `platform`, using `server`
pub fn manager_for(data_dir: &Path, platform: Platform, server: &MockServer) -> DependencyManager {
    let settings = ManagerSettings::new(data_dir, config_for(server)).with_platform(platform);
    DependencyManager::new(settings).unwrap()
}

pub async fn mock_bytes(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

pub async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve the mirror's `stable/release.txt` announcing `version`
pub async fn mock_stable_release(server: &MockServer, version: &str) {
    let body = format!(
        "Client tools for OpenShift\n--------------------------\n\nName:      {v}\nVersion:  {v}\nPull From: quay.io/openshift-release-dev/ocp-release@sha256:0\n",
        v = version
    );
    mock_bytes(
        server,
        &format!("{}/stable/release.txt", OCP_PREFIX),
        body.into_bytes(),
    )
    .await;
}

/// Serve `openshift-client-<artifact>` for `version`
pub async fn mock_oc_artifact(server: &MockServer, version: &str, artifact: &str, body: Vec<u8>) {
    mock_bytes(
        server,
        &format!("{}/{}/openshift-client-{}", OCP_PREFIX, version, artifact),
        body,
    )
    .await;
}

/// Serve the GitHub release listing of the IBM Cloud CLI
pub async fn mock_ibmcloud_releases(server: &MockServer, names: &[&str]) {
    let releases: Vec<serde_json::Value> = names
        .iter()
        .map(|name| serde_json::json!({"tag_name": name, "name": name, "assets": []}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/repos/IBM-Cloud/ibm-cloud-cli-release/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(releases))
        .mount(server)
        .await;
}

/// Relative paths of all entries below `root`, sorted, directories suffixed with `/`
pub fn tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            let relative = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            if path.is_dir() {
                out.push(format!("{}/", relative));
                walk(root, &path, out);
            } else {
                out.push(relative);
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
