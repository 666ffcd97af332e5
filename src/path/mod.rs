// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Root mountpoint indirection for hardware providers.
//!
//! Every path a provider reads is built as
//! `root_mountpoint + subtree_root + relative`, where the root mountpoint
//! defaults to `/` (or `HWSNAP_ROOT_MOUNTPOINT`) and each canonical subtree
//! root (`/etc`, `/proc`, `/run`, `/sys`, `/var`) can be overridden on its
//! own. Pointing the root mountpoint at an expanded snapshot makes the same
//! provider code read captured state instead of the live host.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::utils::paths::join_under;

/// Environment variable that redirects the root mountpoint.
pub const ROOT_MOUNTPOINT_ENV: &str = "HWSNAP_ROOT_MOUNTPOINT";

/// Roots of the filesystem subtrees providers read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRoots {
    pub etc: PathBuf,
    pub proc: PathBuf,
    pub run: PathBuf,
    pub sys: PathBuf,
    pub var: PathBuf,
}

impl Default for PathRoots {
    fn default() -> Self {
        Self {
            etc: PathBuf::from("/etc"),
            proc: PathBuf::from("/proc"),
            run: PathBuf::from("/run"),
            sys: PathBuf::from("/sys"),
            var: PathBuf::from("/var"),
        }
    }
}

impl PathRoots {
    /// Apply overrides keyed by canonical root (`"/proc"`, `"/sys"`, ...).
    /// Unknown keys are ignored.
    pub fn with_overrides(overrides: &BTreeMap<String, PathBuf>) -> Self {
        let mut roots = Self::default();
        for (key, value) in overrides {
            let slot = match key.as_str() {
                "/etc" => &mut roots.etc,
                "/proc" => &mut roots.proc,
                "/run" => &mut roots.run,
                "/sys" => &mut roots.sys,
                "/var" => &mut roots.var,
                _ => continue,
            };
            *slot = value.clone();
        }
        roots
    }
}

/// Explicit options for path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOptions {
    pub root_mountpoint: PathBuf,
    pub overrides: BTreeMap<String, PathBuf>,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self::rooted("/")
    }
}

impl PathOptions {
    /// Options rooted at `root` with no subtree overrides.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root_mountpoint: root.into(),
            overrides: BTreeMap::new(),
        }
    }

    /// Options honouring `HWSNAP_ROOT_MOUNTPOINT`.
    pub fn from_env() -> Self {
        let root = env::var_os(ROOT_MOUNTPOINT_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self::rooted(root)
    }

    /// Override a single canonical subtree root.
    pub fn with_override(mut self, canonical: &str, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(canonical.to_string(), path.into());
        self
    }
}

/// Fully resolved locations of every file tree providers consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub var_log: PathBuf,
    pub proc_meminfo: PathBuf,
    pub proc_cpuinfo: PathBuf,
    pub proc_mounts: PathBuf,
    pub sys_kernel_mm_hugepages: PathBuf,
    pub sys_block: PathBuf,
    pub sys_devices_system_node: PathBuf,
    pub sys_devices_system_memory: PathBuf,
    pub sys_devices_system_cpu: PathBuf,
    pub sys_bus_pci_devices: PathBuf,
    pub sys_bus_pci_drivers: PathBuf,
    pub sys_class_drm: PathBuf,
    pub sys_class_dmi: PathBuf,
    pub sys_class_net: PathBuf,
    pub run_udev_data: PathBuf,
}

impl Paths {
    pub fn new(opts: &PathOptions) -> Self {
        let roots = PathRoots::with_overrides(&opts.overrides);
        let at = |subtree: &Path, rel: &str| {
            join_under(&join_under(&opts.root_mountpoint, subtree), Path::new(rel))
        };
        Self {
            var_log: at(&roots.var, "log"),
            proc_meminfo: at(&roots.proc, "meminfo"),
            proc_cpuinfo: at(&roots.proc, "cpuinfo"),
            proc_mounts: at(&roots.proc, "self/mounts"),
            sys_kernel_mm_hugepages: at(&roots.sys, "kernel/mm/hugepages"),
            sys_block: at(&roots.sys, "block"),
            sys_devices_system_node: at(&roots.sys, "devices/system/node"),
            sys_devices_system_memory: at(&roots.sys, "devices/system/memory"),
            sys_devices_system_cpu: at(&roots.sys, "devices/system/cpu"),
            sys_bus_pci_devices: at(&roots.sys, "bus/pci/devices"),
            sys_bus_pci_drivers: at(&roots.sys, "bus/pci/drivers"),
            sys_class_drm: at(&roots.sys, "class/drm"),
            sys_class_dmi: at(&roots.sys, "class/dmi"),
            sys_class_net: at(&roots.sys, "class/net"),
            run_udev_data: at(&roots.run, "udev/data"),
        }
    }

    pub fn node_meminfo(&self, node: usize) -> PathBuf {
        self.sys_devices_system_node
            .join(format!("node{node}"))
            .join("meminfo")
    }

    pub fn node_cpu(&self, node: usize, cpu: usize) -> PathBuf {
        self.sys_devices_system_node
            .join(format!("node{node}"))
            .join(format!("cpu{cpu}"))
    }

    pub fn node_cpu_cache(&self, node: usize, cpu: usize) -> PathBuf {
        self.node_cpu(node, cpu).join("cache")
    }

    pub fn node_cpu_cache_index(&self, node: usize, cpu: usize, index: usize) -> PathBuf {
        self.node_cpu_cache(node, cpu).join(format!("index{index}"))
    }
}
