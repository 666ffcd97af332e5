// CLASSIFICATION: COMMUNITY
// Filename: address.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! PCI bus addresses in the `domain:bus:device.function` sysfs form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const DOMAIN_DIGITS: usize = 4;
const BUS_DIGITS: usize = 2;
const DEVICE_DIGITS: usize = 2;
const FUNCTION_DIGITS: usize = 1;

/// A parsed PCI address such as `0000:00:1f.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PciAddress {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

/// Returned by [`PciAddress::from_str`] for names that are not PCI addresses.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid PCI address {0:?}")]
pub struct InvalidPciAddress(pub String);

impl PciAddress {
    /// Parse a directory entry name.
    ///
    /// Total: anything other than exactly four hex fields of widths 4, 2, 2
    /// and 1 separated by `:`, `:` and `.` is `None`. Bus directories mix
    /// device entries with driver registries and control files, so a miss
    /// here is the ordinary case and not an error.
    pub fn parse(name: &str) -> Option<Self> {
        let (domain, rest) = name.split_once(':')?;
        let (bus, rest) = rest.split_once(':')?;
        let (device, function) = rest.split_once('.')?;
        Some(Self {
            domain: hex_field(domain, DOMAIN_DIGITS)? as u16,
            bus: hex_field(bus, BUS_DIGITS)? as u8,
            device: hex_field(device, DEVICE_DIGITS)? as u8,
            function: hex_field(function, FUNCTION_DIGITS)? as u8,
        })
    }

    /// True when `name` is shaped like a PCI address.
    pub fn matches(name: &str) -> bool {
        Self::parse(name).is_some()
    }
}

fn hex_field(field: &str, width: usize) -> Option<u32> {
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(field, 16).ok()
}

impl FromStr for PciAddress {
    type Err = InvalidPciAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidPciAddress(s.to_string()))
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}
