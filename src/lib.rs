// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI device sessions.
//!
//! Selects a system MIDI device by index or name fragment, opens output and
//! input sessions against it, and serializes sysex transfers through a
//! single reusable buffer with a bounded wait for completion.

pub mod config;
pub mod error;
pub mod midi;

pub use error::{Error, Result};
pub use midi::{MidiDevice, MidiHandler, Selector, ShortMessage};
