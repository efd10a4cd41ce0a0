// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI device sessions.
//!
//! This module provides a trait-based abstraction over the platform's MIDI
//! device subsystem and the session logic that sits on top of it: device
//! selection, the output transfer handshake and input capture. Backends
//! (Core MIDI, midir, in-memory) are interchangeable behind
//! [`DeviceSubsystem`].

#[cfg(target_os = "macos")]
pub mod coremidi_backend;
pub mod device;
pub mod input;
pub mod memory;
#[cfg(feature = "midir")]
pub mod midir_backend;
pub mod output;
pub mod selector;
pub mod session;
pub mod signal;
pub mod subsystem;

use std::io;

#[cfg(target_os = "macos")]
pub use coremidi_backend::CoreMidiSubsystem;
pub use device::{enumerate, list_devices, DeviceDescriptor, DeviceId, Direction};
pub use input::InputSession;
pub use memory::MemorySubsystem;
#[cfg(feature = "midir")]
pub use midir_backend::MidirSubsystem;
pub use output::{OutputSession, DEFAULT_SYSEX_TIMEOUT};
pub use selector::Selector;
pub use session::MidiDevice;
pub use signal::CompletionSignal;
pub use subsystem::{
    CaptureBuffer, DeviceSubsystem, InputDevice, OutputDevice, TransferHeader, SYSEX_CAPTURE_SIZE,
};

/// The capability every MIDI handler exposes to the rest of the program.
///
/// Methods report success by return value only; failures are logged by the
/// implementation and never panic.
pub trait MidiHandler {
    /// Short identifier of the handler (e.g. `"coremidi"`).
    fn name(&self) -> &'static str;

    /// Open the output device picked by `selector`.
    fn open(&mut self, selector: &str) -> bool;

    /// Open the input device picked by `selector`.
    fn open_input(&mut self, selector: &str) -> bool;

    /// Close both output and input. Safe to call at any time.
    fn close(&mut self);

    /// Send a short channel or system message.
    fn send_short(&mut self, message: ShortMessage);

    /// Send a system exclusive message.
    fn send_sysex(&mut self, sysex: &[u8]);

    /// Write the available output devices to `sink`, one per line.
    fn list(&self, sink: &mut dyn io::Write) -> io::Result<()>;
}

/// A short MIDI message packed into one command word.
///
/// The status byte sits in the low byte, followed by up to two data bytes,
/// matching the layout platform short-message APIs expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortMessage(pub u32);

impl ShortMessage {
    /// Pack up to four raw bytes (status first). Extra bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut word = [0u8; 4];
        for (dst, src) in word.iter_mut().zip(bytes) {
            *dst = *src;
        }
        Self(u32::from_le_bytes(word))
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::from_bytes(&[
            messages::NOTE_ON | (channel & 0x0F),
            note & 0x7F,
            velocity & 0x7F,
        ])
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::from_bytes(&[
            messages::NOTE_OFF | (channel & 0x0F),
            note & 0x7F,
            velocity & 0x7F,
        ])
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::from_bytes(&[
            messages::CONTROL_CHANGE | (channel & 0x0F),
            controller & 0x7F,
            value & 0x7F,
        ])
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::from_bytes(&[messages::PROGRAM_CHANGE | (channel & 0x0F), program & 0x7F])
    }

    pub fn status(&self) -> u8 {
        self.0.to_le_bytes()[0]
    }

    /// Number of meaningful bytes, derived from the status byte.
    pub fn len(&self) -> usize {
        match self.status() {
            0x80..=0xBF | 0xE0..=0xEF | messages::SONG_POSITION => 3,
            0xC0..=0xDF | messages::TIME_CODE | messages::SONG_SELECT => 2,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The meaningful bytes of the message, status first.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_le_bytes()[..self.len()].to_vec()
    }
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;

    // System Common Messages
    pub const SYSEX_START: u8 = 0xF0;
    pub const TIME_CODE: u8 = 0xF1;
    pub const SONG_POSITION: u8 = 0xF2;
    pub const SONG_SELECT: u8 = 0xF3;
    pub const SYSEX_END: u8 = 0xF7;
}
