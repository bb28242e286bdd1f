//! Archive extraction for downloaded artifacts
//!
//! Supports `.tar.gz`/`.tgz` and `.zip`. Members can be selected with a
//! predicate, re-rooted below a start directory, and flattened into the
//! target directory. Extraction happens in a staging directory next to the
//! target so a corrupt archive never leaves partial files behind.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use regex::Regex;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, trace};

/// Kind of an archive member, as seen by member predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Directory,
    RegularFile,
}

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Choose a format by file suffix
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

type MemberFilter<'a> = Box<dyn Fn(&str, MemberKind) -> bool + 'a>;
type PostExtraction<'a> = Box<dyn Fn(&Path) -> Result<()> + 'a>;

/// Options controlling which members are extracted and where
#[derive(Default)]
pub struct ExtractOptions<'a> {
    start_directory: Option<Regex>,
    ignore_directory_structure: bool,
    member_filter: Option<MemberFilter<'a>>,
    post_extraction: Option<PostExtraction<'a>>,
}

impl<'a> ExtractOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only consider members below a directory matching `pattern`, stripping that prefix
    pub fn with_start_directory(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})/", pattern))
            .map_err(|e| Error::parse(format!("Invalid start directory pattern: {}", e)))?;
        self.start_directory = Some(regex);
        Ok(self)
    }

    /// Replace each member name with its basename
    pub fn ignore_directory_structure(mut self, ignore: bool) -> Self {
        self.ignore_directory_structure = ignore;
        self
    }

    /// Extract a member only when `filter(name, kind)` returns true
    pub fn with_member_filter(mut self, filter: impl Fn(&str, MemberKind) -> bool + 'a) -> Self {
        self.member_filter = Some(Box::new(filter));
        self
    }

    /// Run `hook` once per extracted file
    pub fn with_post_extraction(mut self, hook: impl Fn(&Path) -> Result<()> + 'a) -> Self {
        self.post_extraction = Some(Box::new(hook));
        self
    }

    /// Map an archive member name onto its relative output path
    ///
    /// Returns `None` when the member is not selected.
    fn output_name(&self, name: &str, kind: MemberKind) -> Option<PathBuf> {
        let name = name.trim_start_matches("./");
        if let Some(filter) = &self.member_filter {
            if !filter(name, kind) {
                return None;
            }
        }

        let mut name = name.to_string();
        if let Some(start) = &self.start_directory {
            let end = start.find(&name)?.end();
            name = name[end..].to_string();
        }

        if self.ignore_directory_structure {
            if kind == MemberKind::Directory {
                return None;
            }
            name = Path::new(&name).file_name()?.to_str()?.to_string();
        }

        let path: PathBuf = Path::new(&name)
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();

        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }
}

/// One member written to the staging directory
struct StagedMember {
    relative: PathBuf,
    kind: MemberKind,
}

/// Extract `archive_path` into `target_dir`
///
/// Returns the paths of all extracted files. Unknown formats are a no-op.
pub fn extract(
    archive_path: &Path,
    target_dir: &Path,
    options: &ExtractOptions<'_>,
) -> Result<Vec<PathBuf>> {
    let Some(format) = ArchiveFormat::from_path(archive_path) else {
        debug!("Not an archive, skipping extraction: {:?}", archive_path);
        return Ok(Vec::new());
    };

    fs::create_dir_all(target_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(target_dir)?;

    let staged = match format {
        ArchiveFormat::TarGz => stage_tar_gz(archive_path, staging.path(), options)?,
        ArchiveFormat::Zip => stage_zip(archive_path, staging.path(), options)?,
    };

    let mut extracted = Vec::new();
    for member in staged {
        check_no_symlink_ancestor(archive_path, target_dir, &member.relative)?;
        let destination = target_dir.join(&member.relative);

        if member.kind == MemberKind::Directory {
            remove_symlink(&destination)?;
            fs::create_dir_all(&destination)?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::symlink_metadata(&destination).is_ok() {
            fs::remove_file(&destination)?;
        }
        fs::rename(staging.path().join(&member.relative), &destination)?;
        trace!("Extracted {:?}", destination);

        let is_symlink = fs::symlink_metadata(&destination)?.file_type().is_symlink();
        if let (Some(hook), false) = (&options.post_extraction, is_symlink) {
            hook(&destination)?;
        }
        extracted.push(destination);
    }

    debug!(
        "Extracted {} files from {:?} into {:?}",
        extracted.len(),
        archive_path,
        target_dir
    );
    Ok(extracted)
}

/// Validate a raw member name, rejecting absolute paths and `..` components
fn check_member_name(archive: &Path, name: &str) -> Result<()> {
    let unsafe_component = Path::new(name).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });

    if unsafe_component || name.starts_with('/') || name.starts_with('\\') {
        return Err(Error::corrupt_archive(
            archive.display().to_string(),
            format!("member {:?} escapes the target directory", name),
        ));
    }
    Ok(())
}

/// Reject `relative` when one of its parent directories below `root` is a symlink
///
/// A link staged by an earlier member must never redirect a later write.
fn check_no_symlink_ancestor(archive: &Path, root: &Path, relative: &Path) -> Result<()> {
    let Some(parent) = relative.parent() else {
        return Ok(());
    };

    let mut current = root.to_path_buf();
    for component in parent.components() {
        current.push(component);
        let is_symlink = fs::symlink_metadata(&current)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink {
            return Err(Error::corrupt_archive(
                archive.display().to_string(),
                format!(
                    "member {:?} is placed below symlink {:?}",
                    relative,
                    current.strip_prefix(root).unwrap_or(&current)
                ),
            ));
        }
    }
    Ok(())
}

/// Remove `path` if it is a symlink, leaving its target untouched
fn remove_symlink(path: &Path) -> Result<()> {
    if fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn corrupt(archive: &Path, err: impl std::fmt::Display) -> Error {
    Error::corrupt_archive(archive.display().to_string(), err.to_string())
}

/// Record a staged member, replacing an earlier member with the same output path
fn push_staged(staged: &mut Vec<StagedMember>, relative: PathBuf, kind: MemberKind) {
    staged.retain(|m| m.relative != relative);
    staged.push(StagedMember { relative, kind });
}

fn prepare_output(archive: &Path, staging: &Path, relative: &Path) -> Result<PathBuf> {
    check_no_symlink_ancestor(archive, staging, relative)?;
    let output = staging.join(relative);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::symlink_metadata(&output).is_ok() {
        fs::remove_file(&output)?;
    }
    Ok(output)
}

fn stage_directory(archive: &Path, staging: &Path, relative: &Path) -> Result<()> {
    check_no_symlink_ancestor(archive, staging, relative)?;
    let output = staging.join(relative);
    remove_symlink(&output)?;
    fs::create_dir_all(output)?;
    Ok(())
}

fn stage_tar_gz(
    archive_path: &Path,
    staging: &Path,
    options: &ExtractOptions<'_>,
) -> Result<Vec<StagedMember>> {
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut staged = Vec::new();

    for entry in archive.entries().map_err(|e| corrupt(archive_path, e))? {
        let mut entry = entry.map_err(|e| corrupt(archive_path, e))?;
        let name = entry
            .path()
            .map_err(|e| corrupt(archive_path, e))?
            .to_string_lossy()
            .to_string();
        check_member_name(archive_path, &name)?;

        let entry_type = entry.header().entry_type();
        let kind = match entry_type {
            EntryType::Directory => MemberKind::Directory,
            EntryType::Regular | EntryType::Continuous | EntryType::Symlink => {
                MemberKind::RegularFile
            }
            other => {
                trace!("Skipping tar member {:?} of type {:?}", name, other);
                continue;
            }
        };

        let Some(relative) = options.output_name(&name, kind) else {
            trace!("Skipping tar member {:?}", name);
            continue;
        };

        if kind == MemberKind::Directory {
            stage_directory(archive_path, staging, &relative)?;
            push_staged(&mut staged, relative, kind);
            continue;
        }

        let output = prepare_output(archive_path, staging, &relative)?;
        if entry_type == EntryType::Symlink {
            let target = entry
                .link_name()
                .map_err(|e| corrupt(archive_path, e))?
                .ok_or_else(|| corrupt(archive_path, format!("symlink {:?} has no target", name)))?
                .into_owned();
            create_symlink(&target, &output)?;
        } else {
            entry.unpack(&output).map_err(|e| corrupt(archive_path, e))?;
        }
        push_staged(&mut staged, relative, kind);
    }

    Ok(staged)
}

fn stage_zip(
    archive_path: &Path,
    staging: &Path,
    options: &ExtractOptions<'_>,
) -> Result<Vec<StagedMember>> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| corrupt(archive_path, e))?;
    let mut staged = Vec::new();

    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(|e| corrupt(archive_path, e))?;
        let name = member.name().to_string();
        check_member_name(archive_path, &name)?;

        let kind = if member.is_dir() {
            MemberKind::Directory
        } else {
            MemberKind::RegularFile
        };

        let Some(relative) = options.output_name(&name, kind) else {
            trace!("Skipping zip member {:?}", name);
            continue;
        };

        if kind == MemberKind::Directory {
            stage_directory(archive_path, staging, &relative)?;
            push_staged(&mut staged, relative, kind);
            continue;
        }

        let output = prepare_output(archive_path, staging, &relative)?;
        let mode = member.unix_mode();

        if mode.is_some_and(|m| m & 0o170000 == 0o120000) {
            let mut target = String::new();
            io::Read::read_to_string(&mut member, &mut target)
                .map_err(|e| corrupt(archive_path, e))?;
            create_symlink(Path::new(&target), &output)?;
        } else {
            let mut out = File::create(&output)?;
            io::copy(&mut member, &mut out).map_err(|e| corrupt(archive_path, e))?;

            #[cfg(unix)]
            if let Some(mode) = mode {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&output, fs::Permissions::from_mode(mode & 0o7777))?;
            }
        }
        push_staged(&mut staged, relative, kind);
    }

    Ok(staged)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

/// Without symlink privileges the link degrades to a copy of its target
#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    if std::os::windows::fs::symlink_file(target, link).is_ok() {
        return Ok(());
    }

    let resolved = link.parent().map(|p| p.join(target));
    match resolved {
        Some(source) if source.is_file() => {
            fs::copy(source, link)?;
        }
        _ => {
            fs::write(link, target.to_string_lossy().as_bytes())?;
        }
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    fs::write(link, target.to_string_lossy().as_bytes())?;
    Ok(())
}

/// Post-extraction hook setting user/group/other execute bits
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
