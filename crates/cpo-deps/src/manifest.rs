//! Version manifest persistence
//!
//! Records the latest successfully installed version per dependency alias.
//! Located at `<cli-data-dir>/binaries.json`:
//!
//! ```json
//! {
//! 	"ibmcloud": "2.20.0",
//! 	"oc": "4.15.3"
//! }
//! ```
//!
//! Keys are written sorted with tab indentation. Keys this version of the
//! CLI does not know about are preserved verbatim across rewrites.

use crate::error::{Error, Result};
use crate::version::{DependencyVersion, SemanticVersion};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the manifest inside the CLI data directory
pub const MANIFEST_FILE_NAME: &str = "binaries.json";

/// Manifest of installed dependency versions
#[derive(Debug)]
pub struct VersionManifest {
    /// Path to manifest file
    path: PathBuf,

    /// Entries, loaded on first access
    entries: Option<BTreeMap<String, Value>>,
}

impl VersionManifest {
    /// Create a manifest backed by `path`; nothing is read until first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: None,
        }
    }

    /// Create a manifest at the default location inside `data_dir`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(MANIFEST_FILE_NAME))
    }

    /// Path of the manifest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest from disk, treating a missing file as empty
    pub fn load(&mut self) -> Result<()> {
        let entries = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let entries: BTreeMap<String, Value> = serde_json::from_str(&content)?;
            debug!("Loaded manifest with {} entries", entries.len());
            entries
        } else {
            debug!("No manifest at {:?}, starting empty", self.path);
            BTreeMap::new()
        };

        self.entries = Some(entries);
        Ok(())
    }

    fn entries(&mut self) -> Result<&mut BTreeMap<String, Value>> {
        if self.entries.is_none() {
            self.load()?;
        }
        Ok(self.entries.get_or_insert_with(BTreeMap::new))
    }

    /// Latest downloaded version recorded for `alias`
    pub fn latest_downloaded_version(&mut self, alias: &str) -> Result<Option<DependencyVersion>> {
        match self.entries()?.get(alias) {
            None => Ok(None),
            Some(Value::String(text)) => {
                let version = crate::version::parse_semantic_version(text)?;
                Ok(Some(DependencyVersion::new(version)))
            }
            Some(other) => Err(Error::parse(format!(
                "Manifest entry for {} is not a version string: {}",
                alias, other
            ))),
        }
    }

    /// Record `version` as the latest downloaded version of `alias` and persist
    ///
    /// The in-memory entry is only updated once the file has been written.
    pub fn set_latest_downloaded_version(
        &mut self,
        alias: &str,
        version: &SemanticVersion,
    ) -> Result<()> {
        let mut updated = self.entries()?.clone();
        updated.insert(alias.to_string(), Value::String(version.to_string()));

        Self::write_atomically(&self.path, &updated)?;
        self.entries = Some(updated);

        info!("Recorded {} {} in manifest", alias, version);
        Ok(())
    }

    /// All entries whose value is a version string, sorted by alias
    pub fn recorded_versions(&mut self) -> Result<Vec<(String, String)>> {
        Ok(self
            .entries()?
            .iter()
            .filter_map(|(alias, value)| value.as_str().map(|v| (alias.clone(), v.to_string())))
            .collect())
    }

    /// Persist the current entries
    pub fn save(&mut self) -> Result<()> {
        let entries = self.entries()?.clone();
        Self::write_atomically(&self.path, &entries)
    }

    /// Serialize sorted with tab indentation, write to a temp file and rename it into place
    fn write_atomically(path: &Path, entries: &BTreeMap<String, Value>) -> Result<()> {
        let write_error = |source: std::io::Error| Error::ManifestWrite {
            path: path.display().to_string(),
            source,
        };

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(write_error)?;

        let mut content = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut content, formatter);
        entries.serialize(&mut serializer)?;
        content.push(b'\n');

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
        temp.write_all(&content).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(path).map_err(|e| write_error(e.error))?;

        debug!("Saved manifest with {} entries", entries.len());
        Ok(())
    }
}
