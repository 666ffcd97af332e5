// CLASSIFICATION: COMMUNITY
// Filename: expand.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Restore a snapshot archive into an empty directory.

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, info, trace};
use tar::EntryType;

use super::staging::make_symlink;
use super::{path_err, SnapshotError};
use crate::utils::paths::is_contained;

/// Entries restored from the archive, by type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExpandReport {
    pub dirs: usize,
    pub files: usize,
    pub links: usize,
    /// Entries of a type other than directory, regular file or symlink.
    pub ignored: usize,
}

/// Expand the archive at `archive` into `dest`.
///
/// `dest` must not exist (it is created) or be an empty directory; anything
/// else fails with [`SnapshotError::DestinationNotEmpty`] before the archive
/// is opened. Entries are applied strictly in stream order and nothing is
/// rolled back when a later entry fails.
pub fn expand(archive: &Path, dest: &Path) -> Result<ExpandReport, SnapshotError> {
    prepare_destination(dest)?;
    let file = File::open(archive).map_err(path_err("open", archive))?;
    let report = untar(BufReader::new(file), archive, dest)?;
    info!(
        "expanded {} into {} ({} dirs, {} files, {} links)",
        archive.display(),
        dest.display(),
        report.dirs,
        report.files,
        report.links
    );
    Ok(report)
}

fn prepare_destination(dest: &Path) -> Result<(), SnapshotError> {
    match fs::symlink_metadata(dest) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dest).map_err(path_err("mkdir", dest))
        }
        Err(err) => Err(path_err("stat", dest)(err)),
        Ok(_) if is_empty_dir(dest) => Ok(()),
        Ok(_) => Err(SnapshotError::DestinationNotEmpty(dest.to_path_buf())),
    }
}

/// A path that is not a readable directory counts as non-empty.
fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn untar<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<ExpandReport, SnapshotError> {
    let corrupt = |source: io::Error| SnapshotError::ArchiveFormat {
        path: archive.to_path_buf(),
        source,
    };

    let mut ar = tar::Archive::new(GzDecoder::new(reader));
    let mut report = ExpandReport::default();
    for entry in ar.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let name = entry.path().map_err(corrupt)?.into_owned();
        let target = entry_target(dest, &name)?;
        let mode = entry.header().mode().map_err(corrupt)?;

        match entry.header().entry_type() {
            EntryType::Directory => {
                reject_symlinked_path(dest, &name, true)?;
                create_dir(&target, mode)?;
                report.dirs += 1;
            }
            EntryType::Regular | EntryType::Continuous => {
                // The header size is untrusted; let the body decide the allocation.
                let size = entry.size();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).map_err(corrupt)?;
                if data.len() as u64 != size {
                    return Err(corrupt(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("{} truncated at {} of {} bytes", name.display(), data.len(), size),
                    )));
                }
                reject_symlinked_path(dest, &name, true)?;
                ensure_parent(&target)?;
                write_file(&target, mode, &data)?;
                report.files += 1;
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()
                    .map_err(corrupt)?
                    .ok_or_else(|| {
                        corrupt(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("symlink {} has no target", name.display()),
                        ))
                    })?
                    .into_owned();
                reject_symlinked_path(dest, &name, false)?;
                ensure_parent(&target)?;
                make_symlink(&link, &target).map_err(path_err("symlink", &target))?;
                report.links += 1;
            }
            other => {
                trace!("ignoring {:?} entry {}", other, name.display());
                report.ignored += 1;
                continue;
            }
        }
        trace!("expanded {}", name.display());
    }
    debug!("archive {} exhausted", archive.display());
    Ok(report)
}

/// Map an entry name under `dest`, refusing names that would escape it.
fn entry_target(dest: &Path, name: &Path) -> Result<PathBuf, SnapshotError> {
    if name.as_os_str().is_empty() || !is_contained(name) {
        return Err(SnapshotError::UnsafeEntry {
            entry: name.to_path_buf(),
        });
    }
    Ok(dest.join(name))
}

/// Refuse `name` when an already expanded symlink lies on its way below
/// `dest`, since writing through it could land outside `dest`. With
/// `include_last` the entry path itself must not be a symlink either.
fn reject_symlinked_path(dest: &Path, name: &Path, include_last: bool) -> Result<(), SnapshotError> {
    let mut components: Vec<_> = name.components().collect();
    if !include_last {
        components.pop();
    }
    let mut current = dest.to_path_buf();
    for comp in components {
        current.push(comp);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(SnapshotError::UnsafeEntry {
                    entry: name.to_path_buf(),
                });
            }
            Ok(_) => {}
            // Nothing below a missing component exists yet.
            Err(err) if err.kind() == io::ErrorKind::NotFound => break,
            Err(err) => return Err(path_err("lstat", &current)(err)),
        }
    }
    Ok(())
}

fn ensure_parent(target: &Path) -> Result<(), SnapshotError> {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(path_err("mkdir", parent))
        }
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn create_dir(target: &Path, mode: u32) -> Result<(), SnapshotError> {
    use std::os::unix::fs::DirBuilderExt;
    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(target)
        .map_err(path_err("mkdir", target))
}

#[cfg(not(unix))]
fn create_dir(target: &Path, _mode: u32) -> Result<(), SnapshotError> {
    DirBuilder::new()
        .recursive(true)
        .create(target)
        .map_err(path_err("mkdir", target))
}

fn write_file(target: &Path, mode: u32, data: &[u8]) -> Result<(), SnapshotError> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    let mut file = opts.open(target).map_err(path_err("create", target))?;
    file.write_all(data).map_err(path_err("write", target))
}
