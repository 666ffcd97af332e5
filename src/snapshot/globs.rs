// CLASSIFICATION: COMMUNITY
// Filename: globs.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Static part of the capture set.
//!
//! These pseudo-files do not depend on host topology discovered at runtime,
//! so a fixed list of patterns relative to the source root describes them.

use std::path::Path;

use super::FileSpec;

pub const STATIC_GLOBS: &[&str] = &[
    "proc/cpuinfo",
    "proc/meminfo",
    "proc/self/mounts",
    "sys/devices/system/cpu/cpu*/cache/index*/*",
    "sys/devices/system/cpu/cpu*/topology/*",
    "sys/devices/system/memory/block_size_bytes",
    "sys/devices/system/memory/memory*/online",
    "sys/devices/system/memory/memory*/state",
    "sys/devices/system/node/has_*",
    "sys/devices/system/node/online",
    "sys/devices/system/node/possible",
    "sys/devices/system/node/node*/cpu*",
    "sys/devices/system/node/node*/distance",
    "sys/devices/system/node/node*/meminfo",
    "sys/devices/system/node/node*/memory*",
    "sys/devices/system/node/node*/hugepages/hugepages-*/*",
];

/// Directories that always exist in a snapshot, even when empty.
pub const CREATE_PATHS: &[&str] = &["sys/block"];

/// The static catalog rooted at `root`.
pub fn static_specs(root: &Path) -> Vec<FileSpec> {
    STATIC_GLOBS
        .iter()
        .map(|pattern| FileSpec::under(root, pattern))
        .collect()
}
