// CLASSIFICATION: COMMUNITY
// Filename: paths.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Lexical path helpers.
//!
//! Sysfs is a forest of relative symlinks. Resolving them with
//! `fs::canonicalize` would walk through the host's real mount layout, so
//! every resolution here is purely lexical, in the same way a shell resolves
//! `cd a/../b`.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize `path`: drop `.` components and fold `..` into the
/// preceding normal component. A `..` directly under the root is discarded.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve a symlink `target` read from an entry living in `dir`.
///
/// Absolute targets replace `dir`, relative ones are joined to it, and the
/// result is cleaned.
pub fn resolve_link(dir: &Path, target: &Path) -> PathBuf {
    clean(&dir.join(target))
}

/// Join `sub` under `root` even when `sub` is absolute.
///
/// `Path::join` replaces the base when handed an absolute path; this helper
/// re-roots it instead, so `join_under("/redirect", "/proc")` yields
/// `/redirect/proc`.
pub fn join_under(root: &Path, sub: &Path) -> PathBuf {
    let mut out = root.to_path_buf();
    for comp in sub.components() {
        match comp {
            Component::RootDir | Component::Prefix(_) => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True when `path` is relative and never climbs above its base.
pub fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
