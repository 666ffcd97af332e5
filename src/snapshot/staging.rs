// CLASSIFICATION: COMMUNITY
// Filename: staging.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! On-disk mirror of the captured paths.
//!
//! Pseudo-files cannot go into a tar stream directly: they report a size
//! that has nothing to do with what a read returns, so a tar writer trusting
//! the size records empty or truncated files. Each one is read fully into
//! memory and written out as a real file under the build directory, at the
//! same position relative to the build directory as it had relative to the
//! source root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{trace, warn};

use super::{path_err, FileSpec, SnapshotError};

/// Counters for what ended up in the staging tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StagingStats {
    pub files: usize,
    pub links: usize,
    pub dirs: usize,
    /// Source paths whose content could not be read for lack of permission.
    pub skipped: Vec<PathBuf>,
}

/// Outcome of materializing a single source path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Copied {
    File,
    Link,
    Dir,
    /// Directory whose contents are captured separately, if at all.
    Ignored,
    PermissionSkip,
}

#[derive(Debug)]
pub struct StagingTree {
    root: PathBuf,
    source_root: PathBuf,
    stats: StagingStats,
}

impl StagingTree {
    /// Stage under `root`, mirroring paths found under `source_root`.
    pub fn new(root: impl Into<PathBuf>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            source_root: source_root.into(),
            stats: StagingStats::default(),
        }
    }

    pub fn stats(&self) -> &StagingStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut StagingStats {
        &mut self.stats
    }

    pub fn into_stats(self) -> StagingStats {
        self.stats
    }

    /// Create a directory at `rel` inside the tree, with any parents.
    pub fn add_dir(&self, rel: &Path) -> Result<PathBuf, SnapshotError> {
        let dir = self.root.join(rel);
        fs::create_dir_all(&dir).map_err(path_err("mkdir", &dir))?;
        Ok(dir)
    }

    /// Resolve every spec and copy each match into the tree.
    pub fn copy_specs(&mut self, specs: &[FileSpec]) -> Result<(), SnapshotError> {
        for spec in specs {
            for path in spec.resolve()? {
                self.copy_path(&path)?;
            }
        }
        Ok(())
    }

    /// Copy one source path into the tree.
    ///
    /// Symlinks keep their target text. Regular files keep their bytes.
    /// Directories are only created when their relative path mentions
    /// `drivers`: driver directory names carry information, their contents
    /// do not. Any other directory appears as a side effect of copying the
    /// files inside it.
    pub fn copy_path(&mut self, path: &Path) -> Result<Copied, SnapshotError> {
        let rel = self.relative(path)?;
        if let Some(parent) = rel.parent() {
            self.add_dir(parent)?;
        }
        let meta = fs::symlink_metadata(path).map_err(path_err("lstat", path))?;
        let dest = self.root.join(&rel);

        let copied = if meta.is_dir() {
            if rel.to_string_lossy().contains("drivers") {
                self.add_dir(&rel)?;
                self.stats.dirs += 1;
                Copied::Dir
            } else {
                Copied::Ignored
            }
        } else if meta.file_type().is_symlink() {
            copy_link(path, &dest)?;
            self.stats.links += 1;
            Copied::Link
        } else if stage_file(path, &dest, &mut self.stats)? {
            Copied::File
        } else {
            Copied::PermissionSkip
        };
        trace!("staged {} as {:?}", rel.display(), copied);
        Ok(copied)
    }

    fn relative(&self, path: &Path) -> Result<PathBuf, SnapshotError> {
        path.strip_prefix(&self.source_root)
            .map(Path::to_path_buf)
            .map_err(|_| SnapshotError::OutsideSourceRoot {
                path: path.to_path_buf(),
                root: self.source_root.clone(),
            })
    }
}

/// Recreate the symlink at `path` as `dest` with the same target text. An
/// existing `dest` is left alone.
pub(crate) fn copy_link(path: &Path, dest: &Path) -> Result<(), SnapshotError> {
    let target = fs::read_link(path).map_err(path_err("readlink", path))?;
    match make_symlink(&target, dest) {
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        other => other.map_err(path_err("symlink", dest)),
    }
}

/// Read the pseudo-file `src` completely and write the bytes to `dest`.
///
/// Returns `false` when `src` was skipped because its content is not
/// readable; the path is then recorded in `stats.skipped`.
pub(crate) fn stage_file(src: &Path, dest: &Path, stats: &mut StagingStats) -> Result<bool, SnapshotError> {
    let read = fs::read(src).map_err(path_err("read", src));
    stage_bytes(read, src, dest, stats)
}

fn stage_bytes(
    read: Result<Vec<u8>, SnapshotError>,
    src: &Path,
    dest: &Path,
    stats: &mut StagingStats,
) -> Result<bool, SnapshotError> {
    match read {
        Ok(buf) => {
            fs::write(dest, buf).map_err(path_err("write", dest))?;
            stats.files += 1;
            Ok(true)
        }
        // e.g. /sys/devices/virtual/block/zram0/compact is 0200
        Err(err) if is_read_denied(&err) => {
            warn!("permission denied reading {} - skipped", src.display());
            stats.skipped.push(src.to_path_buf());
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// A read refused for lack of permission. Everything else stays fatal.
pub(crate) fn is_read_denied(err: &SnapshotError) -> bool {
    matches!(
        err,
        SnapshotError::Path { op: "read", source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied
    )
}

#[cfg(unix)]
pub(crate) fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
pub(crate) fn make_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are only supported on unix",
    ))
}
