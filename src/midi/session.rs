// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! A complete MIDI device session: one output and one input over a
//! single device subsystem.

use std::io;
use std::time::Duration;

use tracing::warn;

use super::device::{list_devices, Direction};
use super::input::InputSession;
use super::output::OutputSession;
use super::selector::Selector;
use super::subsystem::DeviceSubsystem;
use super::{MidiHandler, ShortMessage};
use crate::error::Result;

/// Output and input sessions against one device subsystem.
///
/// The two halves open and close independently.
pub struct MidiDevice<S: DeviceSubsystem> {
    name: &'static str,
    subsystem: S,
    output: OutputSession<S::Output>,
    input: InputSession<S::Input>,
}

impl<S: DeviceSubsystem> MidiDevice<S> {
    pub fn new(name: &'static str, subsystem: S) -> Self {
        Self {
            name,
            subsystem,
            output: OutputSession::new(),
            input: InputSession::new(),
        }
    }

    /// Set how long a sysex send may wait for the previous transfer.
    pub fn with_sysex_timeout(mut self, timeout: Duration) -> Self {
        self.output.set_timeout(timeout);
        self
    }

    pub fn subsystem(&self) -> &S {
        &self.subsystem
    }

    pub fn output(&self) -> &OutputSession<S::Output> {
        &self.output
    }

    pub fn input(&self) -> &InputSession<S::Input> {
        &self.input
    }

    pub fn open_output(&mut self, selector: &Selector) -> Result<()> {
        self.output.open(&self.subsystem, selector)
    }

    pub fn open_input(&mut self, selector: &Selector) -> Result<()> {
        self.input.open(&self.subsystem, selector)
    }

    pub fn close_output(&mut self) {
        self.output.close();
    }

    pub fn close_input(&mut self) {
        self.input.close();
    }

    pub fn send_short(&mut self, message: ShortMessage) -> Result<()> {
        self.output.send_short(message)
    }

    pub fn send_sysex(&mut self, sysex: &[u8]) -> Result<()> {
        self.output.send_sysex(sysex)
    }

    /// Take everything the input has captured since the last drain.
    pub fn drain_input(&self) -> Vec<u8> {
        self.input.drain()
    }

    pub fn list_inputs(&self, sink: &mut dyn io::Write) -> io::Result<()> {
        list_devices(&self.subsystem, Direction::Input, sink)
    }
}

impl<S: DeviceSubsystem> MidiHandler for MidiDevice<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn open(&mut self, selector: &str) -> bool {
        match self.open_output(&Selector::new(selector)) {
            Ok(()) => true,
            Err(e) => {
                warn!("MIDI: {}: {}", self.name, e);
                false
            }
        }
    }

    fn open_input(&mut self, selector: &str) -> bool {
        match MidiDevice::open_input(self, &Selector::new(selector)) {
            Ok(()) => true,
            Err(e) => {
                warn!("MIDI: {}: {}", self.name, e);
                false
            }
        }
    }

    fn close(&mut self) {
        self.output.close();
        self.input.close();
    }

    fn send_short(&mut self, message: ShortMessage) {
        if let Err(e) = self.output.send_short(message) {
            warn!("MIDI: {}: {}", self.name, e);
        }
    }

    fn send_sysex(&mut self, sysex: &[u8]) {
        if let Err(e) = self.output.send_sysex(sysex) {
            warn!("MIDI: {}: {}", self.name, e);
        }
    }

    fn list(&self, sink: &mut dyn io::Write) -> io::Result<()> {
        list_devices(&self.subsystem, Direction::Output, sink)
    }
}
