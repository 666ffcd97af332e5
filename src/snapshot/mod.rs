// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Capture and restore of the pseudo-filesystem subset hardware providers read.
//!
//! Capture works in two phases. The FileSpec set (static catalog, PCI bus
//! walk, network and graphics class clones) is resolved with glob expansion
//! and every match is copied into a staging tree whose layout mirrors the
//! source root. The staging tree is then packed into a gzip-compressed tar.
//! Expansion reverses the second phase into an empty directory, which can
//! then serve as the root mountpoint for providers (see [`crate::path`]).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::trace;
use thiserror::Error;

pub mod block;
pub mod class;
pub mod create;
pub mod expand;
pub mod globs;
pub mod pack;
pub mod pci;
pub mod staging;

pub use class::{AcceptAll, DeviceClassCloner, DeviceEntry, EntryFilter};
pub use create::{capture, CaptureConfig, CaptureReport, Snapshotter};
pub use expand::{expand, ExpandReport};
pub use pack::{pack, PackReport};
pub use pci::PciBusWalker;
pub use staging::StagingTree;

/// Errors surfaced by capture and expansion.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Listing, stat, symlink, read or write failure on a concrete path.
    #[error("{op} {path}: {source}")]
    Path {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A FileSpec could not be compiled into a glob pattern.
    #[error("invalid file spec {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// A glob match landed outside the capture source root.
    #[error("{path} is outside the source root {root}")]
    OutsideSourceRoot { path: PathBuf, root: PathBuf },
    /// The archive stream is corrupt or truncated.
    #[error("corrupt snapshot archive {path}: {source}")]
    ArchiveFormat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// An archive entry would land outside the destination directory.
    #[error("refusing archive entry {entry:?}: path escapes the destination")]
    UnsafeEntry { entry: PathBuf },
    #[error("file {0} already exists and is of size >0")]
    OutputExists(PathBuf),
    #[error("target directory {0} is not empty")]
    DestinationNotEmpty(PathBuf),
    #[error("snapshot capture is only supported on Linux, not {0}")]
    UnsupportedPlatform(&'static str),
}

impl SnapshotError {
    /// True for failures raised before any destructive work started.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SnapshotError::OutputExists(_)
                | SnapshotError::DestinationNotEmpty(_)
                | SnapshotError::UnsupportedPlatform(_)
        )
    }
}

/// Build a `map_err` adapter tagging an I/O error with the operation and path.
pub(crate) fn path_err(op: &'static str, path: &Path) -> impl FnOnce(io::Error) -> SnapshotError {
    let path = path.to_path_buf();
    move |source| SnapshotError::Path { op, path, source }
}

/// A glob pattern naming zero or more paths to capture.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSpec(String);

impl FileSpec {
    /// A concrete discovered path. Glob metacharacters in it are escaped so a
    /// device name can never act as a wildcard.
    pub fn literal(path: &Path) -> Self {
        FileSpec(Pattern::escape(&path.to_string_lossy()))
    }

    /// A catalog `pattern` (relative, may contain wildcards) under a literal
    /// `root`.
    pub fn under(root: &Path, pattern: &str) -> Self {
        let root = Pattern::escape(&root.to_string_lossy());
        let root = root.trim_end_matches('/');
        FileSpec(format!("{}/{}", root, pattern.trim_start_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expand against the live filesystem.
    ///
    /// Directories that cannot be read while matching are dropped from the
    /// result rather than failing the whole spec.
    pub fn resolve(&self) -> Result<Vec<PathBuf>, SnapshotError> {
        let matches = glob::glob(&self.0).map_err(|source| SnapshotError::Pattern {
            pattern: self.0.clone(),
            source,
        })?;
        let mut out = Vec::new();
        for entry in matches {
            match entry {
                Ok(path) => out.push(path),
                Err(err) => trace!(
                    "glob {}: skipping {}: {}",
                    self.0,
                    err.path().display(),
                    err.error()
                ),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for FileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
