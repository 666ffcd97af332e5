// CLASSIFICATION: COMMUNITY
// Filename: pack.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Stream a staging tree into a gzip-compressed tar archive.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, trace};
use walkdir::WalkDir;

use super::{path_err, SnapshotError};

/// Entries written to the archive, by type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackReport {
    pub files: usize,
    pub links: usize,
    pub dirs: usize,
}

impl PackReport {
    pub fn entries(&self) -> usize {
        self.files + self.links + self.dirs
    }
}

/// Fail with [`SnapshotError::OutputExists`] if `out` already has content.
pub(crate) fn ensure_writable_output(out: &Path) -> Result<(), SnapshotError> {
    match fs::metadata(out) {
        Ok(meta) if meta.len() > 0 => Err(SnapshotError::OutputExists(out.to_path_buf())),
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(path_err("stat", out)(err)),
    }
}

/// Pack everything below `root` into `out`.
///
/// Entry names are relative to `root`, which itself is not an entry. Regular
/// files carry their content and symlinks their target. Directories get an
/// entry of their own only when they are empty, since every other directory
/// is implied by the paths beneath it. The walk is sorted so the same tree
/// always yields the same entry order.
pub fn pack(root: &Path, out: &Path) -> Result<PackReport, SnapshotError> {
    ensure_writable_output(out)?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(out)
        .map_err(path_err("create", out))?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let mut report = PackReport::default();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            SnapshotError::Path { op: "walk", path, source: err.into() }
        })?;
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|_| SnapshotError::OutsideSourceRoot {
                path: path.to_path_buf(),
                root: root.to_path_buf(),
            })?;
        let meta = fs::symlink_metadata(path).map_err(path_err("lstat", path))?;
        let mut header = tar::Header::new_gnu();
        header.set_metadata(&meta);

        let written = if meta.file_type().is_symlink() {
            let target = fs::read_link(path).map_err(path_err("readlink", path))?;
            builder
                .append_link(&mut header, rel, &target)
                .map_err(path_err("write", out))?;
            report.links += 1;
            true
        } else if meta.is_dir() {
            if is_empty_dir(path)? {
                header.set_size(0);
                builder
                    .append_data(&mut header, rel, io::empty())
                    .map_err(path_err("write", out))?;
                report.dirs += 1;
                true
            } else {
                false
            }
        } else if meta.is_file() {
            let data = fs::read(path).map_err(path_err("read", path))?;
            header.set_size(data.len() as u64);
            builder
                .append_data(&mut header, rel, data.as_slice())
                .map_err(path_err("write", out))?;
            report.files += 1;
            true
        } else {
            false
        };
        if written {
            trace!("packed {}", rel.display());
        }
    }

    let encoder = builder.into_inner().map_err(path_err("write", out))?;
    let file: File = encoder.finish().map_err(path_err("write", out))?;
    file.sync_all().map_err(path_err("sync", out))?;
    debug!(
        "packed {} entries ({} files, {} links, {} dirs) into {}",
        report.entries(),
        report.files,
        report.links,
        report.dirs,
        out.display()
    );
    Ok(report)
}

fn is_empty_dir(path: &Path) -> Result<bool, SnapshotError> {
    let mut entries = fs::read_dir(path).map_err(path_err("readdir", path))?;
    Ok(entries.next().is_none())
}
