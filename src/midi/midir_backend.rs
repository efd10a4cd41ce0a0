// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Cross-platform backend built on midir.
//!
//! midir has no mapper device, so the default device is the first port.
//! `send` returns once the bytes are handed to the OS, which is when a long
//! transfer is reported complete.

use midir::{
    Ignore, MidiIO, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput,
    MidiOutputConnection,
};
use tracing::warn;

use super::device::{DeviceId, Direction};
use super::signal::CompletionSignal;
use super::subsystem::{CaptureBuffer, DeviceSubsystem, InputDevice, OutputDevice, TransferHeader};
use super::ShortMessage;
use crate::error::{Error, Result};

/// Device subsystem over midir's system ports.
#[derive(Debug, Clone)]
pub struct MidirSubsystem {
    client_name: String,
}

impl MidirSubsystem {
    /// Create a subsystem that opens midir clients under the given name.
    ///
    /// # Arguments
    /// * `client_name` - Client name shown to other MIDI software
    ///
    /// # Returns
    /// * A subsystem; no client is created until a device is enumerated or opened
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }
}

impl Default for MidirSubsystem {
    fn default() -> Self {
        Self::new("midi-session")
    }
}

fn port_names<IO: MidiIO>(io: &IO) -> Vec<String> {
    io.ports()
        .iter()
        .enumerate()
        .map(|(i, p)| io.port_name(p).unwrap_or_else(|_| format!("Unknown {}", i)))
        .collect()
}

fn pick_port<IO: MidiIO>(io: &IO, device: DeviceId) -> Result<IO::Port> {
    let index = match device {
        DeviceId::Default => 0,
        DeviceId::Index(i) => i,
    };
    io.ports()
        .get(index)
        .cloned()
        .ok_or_else(|| Error::DeviceOpenFailed {
            device: device.to_string(),
            reason: "no such port".to_string(),
        })
}

impl DeviceSubsystem for MidirSubsystem {
    type Output = MidirOutput;
    type Input = MidirInput;

    fn device_names(&self, direction: Direction) -> Vec<String> {
        let names = match direction {
            Direction::Output => MidiOutput::new(&self.client_name).map(|o| port_names(&o)),
            Direction::Input => MidiInput::new(&self.client_name).map(|i| port_names(&i)),
        };
        names.unwrap_or_else(|e| {
            warn!("MIDI: unable to enumerate devices: {}", e);
            Vec::new()
        })
    }

    fn open_output(&self, device: DeviceId, completion: CompletionSignal) -> Result<MidirOutput> {
        let output = MidiOutput::new(&self.client_name)?;
        let port = pick_port(&output, device)?;
        let connection = output
            .connect(&port, &format!("{} output", self.client_name))
            .map_err(|e| Error::DeviceOpenFailed {
                device: device.to_string(),
                reason: e.to_string(),
            })?;
        Ok(MidirOutput {
            connection,
            completion,
        })
    }

    fn open_input(&self, device: DeviceId, capture: CaptureBuffer) -> Result<MidirInput> {
        let mut input = MidiInput::new(&self.client_name)?;
        // sysex and system messages are what the capture buffer is for
        input.ignore(Ignore::None);
        let port = pick_port(&input, device)?;
        Ok(MidirInput {
            input: Some(input),
            port,
            port_name: format!("{} input", self.client_name),
            capture,
            connection: None,
        })
    }
}

/// Output handle from [`MidirSubsystem`].
pub struct MidirOutput {
    connection: MidiOutputConnection,
    completion: CompletionSignal,
}

impl OutputDevice for MidirOutput {
    fn send_short(&mut self, message: ShortMessage) -> Result<()> {
        self.connection
            .send(&message.to_vec())
            .map_err(|e| Error::TransferSubmitFailed(e.to_string()))
    }

    fn prepare(&mut self, header: &mut TransferHeader) -> Result<()> {
        if header.is_empty() {
            return Err(Error::TransferPrepareFailed("empty payload".to_string()));
        }
        header.set_prepared(true);
        Ok(())
    }

    fn unprepare(&mut self, header: &mut TransferHeader) {
        header.set_prepared(false);
    }

    fn submit_long(&mut self, header: &TransferHeader) -> Result<()> {
        self.connection
            .send(header.data())
            .map_err(|e| Error::TransferSubmitFailed(e.to_string()))?;
        self.completion.set();
        Ok(())
    }
}

/// Input handle from [`MidirSubsystem`].
///
/// midir consumes the client on connect, so capture starts by connecting
/// and stops by closing the connection and taking the client back.
pub struct MidirInput {
    input: Option<MidiInput>,
    port: MidiInputPort,
    port_name: String,
    capture: CaptureBuffer,
    connection: Option<MidiInputConnection<()>>,
}

impl InputDevice for MidirInput {
    fn prepare(&mut self) -> Result<()> {
        self.capture.set_prepared(true);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let input = self
            .input
            .take()
            .ok_or_else(|| Error::Capture("capture already started".to_string()))?;
        let capture = self.capture.clone();
        let connection = input
            .connect(
                &self.port,
                &self.port_name,
                move |_, message, _| {
                    capture.record(message);
                },
                (),
            )
            .map_err(|e| Error::Capture(e.to_string()))?;
        self.connection = Some(connection);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(connection) = self.connection.take() {
            let (input, _) = connection.close();
            self.input = Some(input);
        }
    }
}

impl Drop for MidirInput {
    fn drop(&mut self) {
        self.stop();
    }
}
