// CLASSIFICATION: COMMUNITY
// Filename: create.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Snapshot capture.

use std::env;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::block::BlockDeviceCloner;
use super::class::{drm_cloner, net_cloner};
use super::globs::{static_specs, CREATE_PATHS};
use super::pack::{ensure_writable_output, pack, PackReport};
use super::pci::PciBusWalker;
use super::staging::StagingTree;
use super::{FileSpec, SnapshotError};
use crate::path::{PathOptions, Paths};
use crate::utils::paths::clean;

/// Environment variable overriding the root captured from.
pub const SOURCE_ROOT_ENV: &str = "HWSNAP_SOURCE_ROOT";

/// Everything a capture run needs, passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Root the pseudo-filesystems are read from, `/` on a live host.
    pub source_root: PathBuf,
    /// Scratch directory for the staging tree. Owned by one run at a time.
    pub build_path: PathBuf,
    /// Archive to write. Must be missing or empty.
    pub out_path: PathBuf,
}

impl CaptureConfig {
    /// Capture from `HWSNAP_SOURCE_ROOT`, or `/` when unset.
    pub fn new(build_path: impl Into<PathBuf>, out_path: impl Into<PathBuf>) -> Self {
        let source_root = env::var_os(SOURCE_ROOT_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self {
            source_root,
            build_path: build_path.into(),
            out_path: out_path.into(),
        }
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }
}

/// What a capture run produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    /// FileSpecs resolved against the source root.
    pub specs: usize,
    pub files: usize,
    pub links: usize,
    pub dirs: usize,
    /// Files left out because their content was not readable.
    pub skipped: Vec<PathBuf>,
    pub archive: PackReport,
}

pub struct Snapshotter {
    config: CaptureConfig,
    paths: Paths,
}

impl Snapshotter {
    /// The source root is made absolute and cleaned here: glob matches come
    /// back normalized and must strip back to it.
    pub fn new(mut config: CaptureConfig) -> Self {
        config.source_root = absolute_root(&config.source_root);
        let paths = Paths::new(&PathOptions::rooted(&config.source_root));
        Self { config, paths }
    }

    /// The complete capture set: static catalog, PCI devices, physical
    /// network interfaces and primary graphics cards.
    pub fn file_specs(&self) -> Vec<FileSpec> {
        let mut specs = static_specs(&self.config.source_root);
        specs.extend(PciBusWalker::new(&self.paths).file_specs());
        specs.extend(net_cloner(&self.paths).file_specs());
        specs.extend(drm_cloner(&self.paths).file_specs());
        specs
    }

    /// Stage the capture set under the build path and pack it into the
    /// output archive.
    pub fn capture(&self) -> Result<CaptureReport, SnapshotError> {
        ensure_supported_platform()?;
        ensure_writable_output(&self.config.out_path)?;

        let build = self.config.build_path.as_path();
        let mut tree = StagingTree::new(build, &self.config.source_root);
        for dir in CREATE_PATHS {
            tree.add_dir(Path::new(dir))?;
        }
        BlockDeviceCloner::new(&self.paths.sys_block, build).clone_into(tree.stats_mut())?;

        let specs = self.file_specs();
        debug!("capturing {} file specs from {}", specs.len(), self.config.source_root.display());
        tree.copy_specs(&specs)?;
        let stats = tree.into_stats();

        let archive = pack(build, &self.config.out_path)?;
        info!(
            "captured {} files, {} links ({} skipped) into {}",
            stats.files,
            stats.links,
            stats.skipped.len(),
            self.config.out_path.display()
        );
        Ok(CaptureReport {
            specs: specs.len(),
            files: stats.files,
            links: stats.links,
            dirs: stats.dirs,
            skipped: stats.skipped,
            archive,
        })
    }
}

/// Capture the host into `out_path`, staging under `build_path`.
pub fn capture(build_path: &Path, out_path: &Path) -> Result<CaptureReport, SnapshotError> {
    Snapshotter::new(CaptureConfig::new(build_path, out_path)).capture()
}

fn absolute_root(root: &Path) -> PathBuf {
    if root.is_absolute() {
        return clean(root);
    }
    match env::current_dir() {
        Ok(cwd) => clean(&cwd.join(root)),
        Err(err) => {
            debug!("cwd unavailable ({}), keeping {} relative", err, root.display());
            clean(root)
        }
    }
}

fn ensure_supported_platform() -> Result<(), SnapshotError> {
    if cfg!(target_os = "linux") {
        Ok(())
    } else {
        Err(SnapshotError::UnsupportedPlatform(env::consts::OS))
    }
}
