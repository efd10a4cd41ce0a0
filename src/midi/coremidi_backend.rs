// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Core MIDI backend for macOS.
//!
//! Destinations are output devices, sources are input devices. The default
//! device is the first destination (or source). Packets are handed to the
//! system synchronously, so long transfers complete on return.

use coremidi::{
    Client, Destination, Destinations, InputPort, OutputPort, PacketBuffer, PacketList, Source,
    Sources,
};

use super::device::{DeviceId, Direction};
use super::signal::CompletionSignal;
use super::subsystem::{CaptureBuffer, DeviceSubsystem, InputDevice, OutputDevice, TransferHeader};
use super::ShortMessage;
use crate::error::{Error, Result};

/// Device subsystem over Core MIDI.
#[derive(Debug, Clone)]
pub struct CoreMidiSubsystem {
    client_name: String,
}

impl CoreMidiSubsystem {
    /// Create a subsystem that opens Core MIDI clients under the given name.
    ///
    /// # Arguments
    /// * `client_name` - Client name shown to other MIDI software
    ///
    /// # Returns
    /// * A subsystem; no client is created until a device is opened
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn client(&self, device: DeviceId) -> Result<Client> {
        Client::new(&self.client_name).map_err(|e| Error::DeviceOpenFailed {
            device: device.to_string(),
            reason: format!("failed to create MIDI client: {:?}", e),
        })
    }
}

impl Default for CoreMidiSubsystem {
    fn default() -> Self {
        Self::new("midi-session")
    }
}

fn index_of(device: DeviceId) -> usize {
    match device {
        DeviceId::Default => 0,
        DeviceId::Index(i) => i,
    }
}

impl DeviceSubsystem for CoreMidiSubsystem {
    type Output = CoreMidiOutput;
    type Input = CoreMidiInput;

    fn device_names(&self, direction: Direction) -> Vec<String> {
        match direction {
            Direction::Output => Destinations
                .into_iter()
                .enumerate()
                .map(|(i, d)| d.display_name().unwrap_or_else(|| format!("Unknown {}", i)))
                .collect(),
            Direction::Input => Sources
                .into_iter()
                .enumerate()
                .map(|(i, s)| s.display_name().unwrap_or_else(|| format!("Unknown {}", i)))
                .collect(),
        }
    }

    fn open_output(
        &self,
        device: DeviceId,
        completion: CompletionSignal,
    ) -> Result<CoreMidiOutput> {
        let destination =
            Destination::from_index(index_of(device)).ok_or_else(|| Error::DeviceOpenFailed {
                device: device.to_string(),
                reason: format!("only {} destinations available", Destinations::count()),
            })?;

        let client = self.client(device)?;
        let output_port = client
            .output_port(&format!("{} output", self.client_name))
            .map_err(|e| Error::DeviceOpenFailed {
                device: device.to_string(),
                reason: format!("failed to create output port: {:?}", e),
            })?;

        Ok(CoreMidiOutput {
            _client: client,
            output_port,
            destination,
            completion,
        })
    }

    fn open_input(&self, device: DeviceId, capture: CaptureBuffer) -> Result<CoreMidiInput> {
        let source =
            Source::from_index(index_of(device)).ok_or_else(|| Error::DeviceOpenFailed {
                device: device.to_string(),
                reason: format!("only {} sources available", Sources::count()),
            })?;

        let client = self.client(device)?;
        let recorder = capture.clone();
        let input_port = client
            .input_port(
                &format!("{} input", self.client_name),
                move |packet_list: &PacketList| {
                    for packet in packet_list.iter() {
                        recorder.record(packet.data());
                    }
                },
            )
            .map_err(|e| Error::DeviceOpenFailed {
                device: device.to_string(),
                reason: format!("failed to create input port: {:?}", e),
            })?;

        Ok(CoreMidiInput {
            _client: client,
            input_port,
            source,
            capture,
            connected: false,
        })
    }
}

/// Output handle from [`CoreMidiSubsystem`].
pub struct CoreMidiOutput {
    _client: Client,
    output_port: OutputPort,
    destination: Destination,
    completion: CompletionSignal,
}

impl CoreMidiOutput {
    fn send_packet(&self, data: &[u8]) -> Result<()> {
        // timestamp 0 sends immediately
        let packet_buffer = PacketBuffer::new(0, data);
        self.output_port
            .send(&self.destination, &packet_buffer)
            .map_err(|e| Error::TransferSubmitFailed(format!("{:?}", e)))
    }
}

impl OutputDevice for CoreMidiOutput {
    fn send_short(&mut self, message: ShortMessage) -> Result<()> {
        self.send_packet(&message.to_vec())
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
        self.send_packet(header.data())?;
        self.completion.set();
        Ok(())
    }
}

/// Input handle from [`CoreMidiSubsystem`].
pub struct CoreMidiInput {
    _client: Client,
    input_port: InputPort,
    source: Source,
    capture: CaptureBuffer,
    connected: bool,
}

impl InputDevice for CoreMidiInput {
    fn prepare(&mut self) -> Result<()> {
        self.capture.set_prepared(true);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.input_port
            .connect_source(&self.source)
            .map_err(|e| Error::Capture(format!("failed to connect to source: {:?}", e)))?;
        self.connected = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.connected {
            let _ = self.input_port.disconnect_source(&self.source);
            self.connected = false;
        }
    }
}

impl Drop for CoreMidiInput {
    fn drop(&mut self) {
        self.stop();
    }
}
