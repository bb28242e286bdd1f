//! Archive fixtures built in memory

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tar::{EntryType, Header};

/// One archive member
#[derive(Debug, Clone)]
pub enum Member {
    File {
        name: String,
        content: Vec<u8>,
        mode: u32,
    },
    Dir {
        name: String,
    },
    Symlink {
        name: String,
        target: String,
    },
}

pub fn file(name: &str, content: &str) -> Member {
    Member::File {
        name: name.to_string(),
        content: content.as_bytes().to_vec(),
        mode: 0o644,
    }
}

pub fn executable(name: &str, content: &str) -> Member {
    Member::File {
        name: name.to_string(),
        content: content.as_bytes().to_vec(),
        mode: 0o755,
    }
}

pub fn dir(name: &str) -> Member {
    Member::Dir {
        name: name.to_string(),
    }
}

pub fn symlink(name: &str, target: &str) -> Member {
    Member::Symlink {
        name: name.to_string(),
        target: target.to_string(),
    }
}

/// Build a gzip-compressed tarball
pub fn tar_gz(members: &[Member]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for member in members {
        let mut header = Header::new_gnu();
        match member {
            Member::File {
                name,
                content,
                mode,
            } => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(content.len() as u64);
                header.set_mode(*mode);
                builder
                    .append_data(&mut header, name, content.as_slice())
                    .unwrap();
            }
            Member::Dir { name } => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder
                    .append_data(&mut header, name, std::io::empty())
                    .unwrap();
            }
            Member::Symlink { name, target } => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder
                    .append_link(&mut header, name, target)
                    .unwrap();
            }
        }
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Build a tarball whose single member name is written verbatim
///
/// `tar::Builder` refuses `..` components, so the name bytes are set directly.
pub fn tar_gz_with_raw_name(name: &str, content: &[u8]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = Header::new_old();
    let raw = name.as_bytes();
    header.as_old_mut().name[..raw.len()].copy_from_slice(raw);
    header.set_entry_type(EntryType::Regular);
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, content).unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

/// Build a zip archive
pub fn zip(members: &[Member]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for member in members {
        match member {
            Member::File {
                name,
                content,
                mode,
            } => {
                let options = SimpleFileOptions::default().unix_permissions(*mode);
                writer.start_file(name.as_str(), options).unwrap();
                writer.write_all(content).unwrap();
            }
            Member::Dir { name } => {
                writer
                    .add_directory(name.as_str(), SimpleFileOptions::default())
                    .unwrap();
            }
            Member::Symlink { name, target } => {
                writer
                    .add_symlink(name.as_str(), target.as_str(), SimpleFileOptions::default())
                    .unwrap();
            }
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Write `bytes` to `dir/name` and return the path
pub fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Relative paths of all entries below `root`, sorted, directories suffixed with `/`
pub fn tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            let relative = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            if entry.file_type().unwrap().is_dir() {
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
