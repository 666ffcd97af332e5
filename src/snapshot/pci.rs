// CLASSIFICATION: COMMUNITY
// Filename: pci.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! PCI device tree discovery.
//!
//! The PCI topology is host specific, so the capture set for it is found at
//! runtime. The walk starts at the canonical bus directory and follows
//! bridges breadth first: a CPU package usually exposes one or more root
//! buses, and bridges hanging off them form arbitrarily deep subtrees.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use super::FileSpec;
use crate::path::Paths;
use crate::pci::PciAddress;
use crate::utils::paths::resolve_link;

/// Attributes captured for every PCI device.
pub const PER_DEVICE_ENTRIES: &[&str] = &[
    "class",
    "device",
    "driver",
    "irq",
    "local_cpulist",
    "modalias",
    "numa_node",
    "revision",
    "vendor",
];

/// Outcome of a bus walk.
#[derive(Debug, Default)]
pub struct PciWalk {
    pub specs: Vec<FileSpec>,
    /// Bus directories scanned, in visiting order.
    pub buses: Vec<PathBuf>,
    /// Every device found with its resolved device directory.
    pub devices: Vec<(PciAddress, PathBuf)>,
}

/// Breadth-first walker over the PCI bus forest.
#[derive(Debug, Clone)]
pub struct PciBusWalker {
    devices_dir: PathBuf,
    drivers_dir: PathBuf,
}

impl PciBusWalker {
    pub fn new(paths: &Paths) -> Self {
        Self {
            devices_dir: paths.sys_bus_pci_devices.clone(),
            drivers_dir: paths.sys_bus_pci_drivers.clone(),
        }
    }

    pub fn file_specs(&self) -> Vec<FileSpec> {
        self.walk().specs
    }

    /// Walk every bus reachable from the canonical devices directory.
    ///
    /// Each bus directory is scanned at most once and each device directory
    /// contributes its attributes once, keyed by canonical path, so the walk
    /// terminates on any finite tree even when sysfs symlinks form cycles.
    pub fn walk(&self) -> PciWalk {
        let mut walk = PciWalk::default();
        walk.specs.push(FileSpec::under(&self.drivers_dir, "*"));

        let mut queue = VecDeque::from([self.devices_dir.clone()]);
        let mut seen_buses = HashSet::new();
        let mut seen_devices = HashSet::new();
        while let Some(bus) = queue.pop_front() {
            if !seen_buses.insert(identity(&bus)) {
                continue;
            }
            let bridges = scan_bus(&bus, &mut walk, &mut seen_devices);
            walk.buses.push(bus);
            queue.extend(bridges);
        }
        debug!(
            "pci walk: {} buses, {} devices, {} specs",
            walk.buses.len(),
            walk.devices.len(),
            walk.specs.len()
        );
        walk
    }
}

/// Scan one bus directory, returning the device directories that are
/// bridges to further buses.
fn scan_bus(bus: &Path, walk: &mut PciWalk, seen_devices: &mut HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut bridges = Vec::new();
    let entries = match fs::read_dir(bus) {
        Ok(entries) => entries,
        Err(err) => {
            trace!("pci: cannot list {}: {}", bus.display(), err);
            return bridges;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        // Driver registries and control files share the directory; not an
        // address means not a device, and is not worth a log line.
        let Some(addr) = name.to_str().and_then(PciAddress::parse) else {
            continue;
        };
        let entry_path = bus.join(&name);
        let device_dir = match device_dir_of(bus, &entry_path) {
            Ok(dir) => dir,
            Err(err) => {
                trace!("pci: cannot resolve {}: {} - skipped", entry_path.display(), err);
                continue;
            }
        };

        walk.specs.push(FileSpec::literal(&entry_path));
        if !seen_devices.insert(identity(&device_dir)) {
            continue;
        }
        for attr in PER_DEVICE_ENTRIES {
            walk.specs.push(FileSpec::literal(&device_dir.join(attr)));
        }
        if is_bridge(&device_dir) {
            bridges.push(device_dir.clone());
        }
        walk.devices.push((addr, device_dir));
    }
    bridges
}

/// The real device directory behind a bus entry.
fn device_dir_of(bus: &Path, entry_path: &Path) -> io::Result<PathBuf> {
    let meta = fs::symlink_metadata(entry_path)?;
    if !meta.file_type().is_symlink() {
        return Ok(entry_path.to_path_buf());
    }
    let target = fs::read_link(entry_path)?;
    Ok(resolve_link(bus, &target))
}

/// A device is a bridge when it has an immediate subdirectory named like a
/// PCI address. This over-approximates (any address-shaped child counts) in
/// exchange for not duplicating the device-class decoding providers do.
fn is_bridge(device_dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(device_dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
            && entry.file_name().to_str().is_some_and(PciAddress::matches)
    })
}

fn identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
