// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for MIDI device sessions.

use std::time::Duration;

use thiserror::Error;

/// Failures reported by the output and input sessions.
///
/// None of these are fatal: the caller decides whether to retry,
/// pick another device, or give up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The selector matched no enumerated device.
    #[error("no MIDI device matches selector '{0}'")]
    SelectorUnresolved(String),

    /// The device subsystem refused to open the device (busy, unsupported, gone).
    #[error("failed to open MIDI device {device}: {reason}")]
    DeviceOpenFailed { device: String, reason: String },

    /// `open` was called on a session that is already open.
    #[error("MIDI session is already open")]
    AlreadyOpen,

    /// A transfer was requested on a closed session.
    #[error("MIDI session is not open")]
    NotOpen,

    /// The previous sysex transfer did not complete within the bound.
    #[error("timed out after {0:?} waiting for previous sysex transfer")]
    TransferTimeout(Duration),

    #[error("failed to prepare sysex transfer: {0}")]
    TransferPrepareFailed(String),

    #[error("failed to submit sysex transfer: {0}")]
    TransferSubmitFailed(String),

    /// Starting or stopping input capture failed.
    #[error("MIDI capture error: {0}")]
    Capture(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "midir")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::DeviceOpenFailed {
            device: "midir client".to_string(),
            reason: e.to_string(),
        }
    }
}
