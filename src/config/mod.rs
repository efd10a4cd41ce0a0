// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for MIDI sessions.
//!
//! Loaded from a TOML file with a single `[midi]` table holding the device
//! selectors and the sysex timeout.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::midi::{Selector, DEFAULT_SYSEX_TIMEOUT};

/// Root of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub midi: MidiConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML configuration")
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration to TOML")
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = self.to_toml()?;
        fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }
}

/// MIDI device settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MidiConfig {
    /// Output device selector: empty for the default device, an index, or a name fragment
    #[serde(default)]
    pub device: String,
    /// Input device selector; input stays closed when absent
    #[serde(default)]
    pub input: Option<String>,
    /// How long a sysex send waits for the previous transfer, in milliseconds
    #[serde(default = "default_sysex_timeout_ms")]
    pub sysex_timeout_ms: u64,
}

fn default_sysex_timeout_ms() -> u64 {
    DEFAULT_SYSEX_TIMEOUT.as_millis() as u64
}

impl MidiConfig {
    pub fn output_selector(&self) -> Selector {
        Selector::new(self.device.as_str())
    }

    pub fn input_selector(&self) -> Option<Selector> {
        self.input.as_deref().map(Selector::new)
    }

    pub fn sysex_timeout(&self) -> Duration {
        Duration::from_millis(self.sysex_timeout_ms)
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            input: None,
            sysex_timeout_ms: default_sysex_timeout_ms(),
        }
    }
}
