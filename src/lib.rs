// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.1
// Date Modified: 2026-10-15
// Author: Lukas Bower

//! Portable snapshots of the `/proc` and `/sys` hardware description trees.
//!
//! [`snapshot::capture`] copies the pseudo-files describing CPUs, memory,
//! NUMA nodes, PCI devices, block devices, network interfaces and graphics
//! cards into a gzip-compressed tar archive. [`snapshot::expand`] restores
//! such an archive into an empty directory, and [`path::Paths`] resolves
//! provider paths against either the live root or that restored tree.

/// Lexical path helpers shared across modules
pub mod utils;

/// PCI address parsing
pub mod pci;

/// Root mountpoint indirection for hardware providers
pub mod path;

/// Capture, packing and expansion of snapshots
pub mod snapshot;

pub use snapshot::{capture, expand, CaptureConfig, CaptureReport, ExpandReport, SnapshotError};
