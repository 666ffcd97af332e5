// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

/// PCI naming helpers shared by the bus walker and providers.
pub mod address;

pub use address::{InvalidPciAddress, PciAddress};
