// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Device selectors.
//!
//! A selector is what a user types to pick a device: nothing (the system
//! default), an index into the device list, or a fragment of the device
//! name. Numbers take precedence over names, and a number that parses but
//! is out of range selects nothing rather than being retried as a name.

use super::device::{DeviceDescriptor, DeviceId};

/// A user-supplied device selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector(String);

impl Selector {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the selector asks for the system default device.
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the leading index, if any.
    ///
    /// Follows unsigned stream extraction: leading whitespace and an
    /// optional `+` or `-` are skipped, the longest run of digits is read,
    /// anything after it is ignored. A negated value wraps modulo 2^32, so
    /// `"-1"` is `u32::MAX` and selects nothing. No digits or a magnitude
    /// too large for `u32` is a parse failure.
    pub fn index(&self) -> Option<usize> {
        let s = self.0.trim_start();
        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let end = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let n = s[..end].parse::<u32>().ok()?;
        let n = if negative { n.wrapping_neg() } else { n };
        Some(n as usize)
    }

    /// Resolve against a fresh enumeration.
    ///
    /// # Arguments
    /// * `devices` - The current device list, in subsystem order
    ///
    /// # Returns
    /// * `Some(DeviceId::Default)` for an empty selector
    /// * `Some(DeviceId::Index)` for an in-range index or the first name match
    /// * `None` when nothing matches; there is no fallback to the default device
    pub fn resolve(&self, devices: &[DeviceDescriptor]) -> Option<DeviceId> {
        if self.is_default() {
            return Some(DeviceId::Default);
        }

        if let Some(index) = self.index() {
            return (index < devices.len()).then_some(DeviceId::Index(index));
        }

        let needle = self.0.to_lowercase();
        devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
            .map(|d| DeviceId::Index(d.index))
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Self(s)
    }
}
