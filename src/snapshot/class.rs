// CLASSIFICATION: COMMUNITY
// Filename: class.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Clone devices by class.
//!
//! Every entry in `/sys/class/$CLASS` is a symlink naming a logical device
//! and pointing at its backing device directory. Entries are filtered by
//! name and by link target, then the symlink plus a list of attributes under
//! the backing directory are captured.

use std::fs;
use std::path::PathBuf;

use log::{debug, trace};

use super::FileSpec;
use crate::path::Paths;
use crate::utils::paths::resolve_link;

/// Network interfaces behind this subtree are software devices.
pub const VIRTUAL_NET_MARKER: &str = "devices/virtual/net";

/// Attributes captured per network interface. `address` is left out on
/// purpose: it identifies the host.
pub const NET_ENTRIES: &[&str] = &["addr_assign_type"];

/// Attributes captured per graphics card.
pub const DRM_ENTRIES: &[&str] = &["device"];

/// Predicate over an entry name or a link target.
pub trait EntryFilter {
    fn accept(&self, value: &str) -> bool;
}

impl<F> EntryFilter for F
where
    F: Fn(&str) -> bool,
{
    fn accept(&self, value: &str) -> bool {
        self(value)
    }
}

/// Filter that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl EntryFilter for AcceptAll {
    fn accept(&self, _value: &str) -> bool {
        true
    }
}

/// A class entry accepted by both filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: String,
    /// Link target exactly as stored in the symlink.
    pub link: PathBuf,
}

pub struct DeviceClassCloner<N = AcceptAll, L = AcceptAll> {
    class_dir: PathBuf,
    entries: Vec<String>,
    name_filter: N,
    link_filter: L,
}

impl DeviceClassCloner {
    pub fn new(class_dir: impl Into<PathBuf>, entries: &[&str]) -> Self {
        Self {
            class_dir: class_dir.into(),
            entries: entries.iter().map(|e| e.to_string()).collect(),
            name_filter: AcceptAll,
            link_filter: AcceptAll,
        }
    }
}

impl<N: EntryFilter, L: EntryFilter> DeviceClassCloner<N, L> {
    pub fn with_name_filter<F: EntryFilter>(self, filter: F) -> DeviceClassCloner<F, L> {
        DeviceClassCloner {
            class_dir: self.class_dir,
            entries: self.entries,
            name_filter: filter,
            link_filter: self.link_filter,
        }
    }

    pub fn with_link_filter<F: EntryFilter>(self, filter: F) -> DeviceClassCloner<N, F> {
        DeviceClassCloner {
            class_dir: self.class_dir,
            entries: self.entries,
            name_filter: self.name_filter,
            link_filter: filter,
        }
    }

    /// Entries passing the name filter and then the link filter. A missing
    /// class directory or an unreadable link yields no entry.
    pub fn accepted(&self) -> Vec<DeviceEntry> {
        let Ok(dir) = fs::read_dir(&self.class_dir) else {
            trace!("class: {} not readable", self.class_dir.display());
            return Vec::new();
        };
        let mut accepted = Vec::new();
        for entry in dir.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.name_filter.accept(&name) {
                continue;
            }
            let link = match fs::read_link(entry.path()) {
                Ok(link) => link,
                Err(err) => {
                    trace!("class: readlink {}: {}", entry.path().display(), err);
                    continue;
                }
            };
            if !self.link_filter.accept(&link.to_string_lossy()) {
                continue;
            }
            accepted.push(DeviceEntry { name, link });
        }
        accepted
    }

    /// The class symlink of each accepted entry, followed by the requested
    /// attributes under its backing device directory.
    pub fn file_specs(&self) -> Vec<FileSpec> {
        let mut specs = Vec::new();
        for dev in self.accepted() {
            specs.push(FileSpec::literal(&self.class_dir.join(&dev.name)));
            let backing = resolve_link(&self.class_dir, &dev.link);
            for attr in &self.entries {
                specs.push(FileSpec::literal(&backing.join(attr)));
            }
        }
        debug!("class {}: {} specs", self.class_dir.display(), specs.len());
        specs
    }
}

/// Physical network interfaces.
pub fn net_cloner(paths: &Paths) -> DeviceClassCloner<AcceptAll, impl EntryFilter> {
    DeviceClassCloner::new(&paths.sys_class_net, NET_ENTRIES)
        .with_link_filter(|link: &str| !link.contains(VIRTUAL_NET_MARKER))
}

/// Primary graphics cards: `card0` but not `card0-DP-1` connectors or
/// `renderD128` nodes.
pub fn drm_cloner(paths: &Paths) -> DeviceClassCloner<impl EntryFilter, AcceptAll> {
    DeviceClassCloner::new(&paths.sys_class_drm, DRM_ENTRIES)
        .with_name_filter(|name: &str| name.starts_with("card") && !name.contains('-'))
}
