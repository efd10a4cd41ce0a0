// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Device enumeration and listing.

use std::fmt;
use std::io;

use super::subsystem::DeviceSubsystem;

/// Which side of the device subsystem to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Output,
    Input,
}

/// Identity of a device to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceId {
    /// The platform's default (mapper) device, chosen without enumerating.
    Default,
    /// Ordinal position in the current enumeration.
    Index(usize),
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Default => write!(f, "default"),
            DeviceId::Index(i) => write!(f, "#{}", i),
        }
    }
}

/// One enumerated device.
///
/// Only meaningful for the enumeration it came from; indices can shift as
/// devices come and go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
}

/// Enumerate all devices in one direction, in subsystem order.
pub fn enumerate<S: DeviceSubsystem + ?Sized>(
    subsystem: &S,
    direction: Direction,
) -> Vec<DeviceDescriptor> {
    subsystem
        .device_names(direction)
        .into_iter()
        .enumerate()
        .map(|(index, name)| DeviceDescriptor { index, name })
        .collect()
}

/// Write one line per device: index, a tab, and the quoted name.
pub fn list_devices<S: DeviceSubsystem + ?Sized>(
    subsystem: &S,
    direction: Direction,
    sink: &mut dyn io::Write,
) -> io::Result<()> {
    for device in enumerate(subsystem, direction) {
        writeln!(sink, "{:2}\t \"{}\"", device.index, device.name)?;
    }
    Ok(())
}
