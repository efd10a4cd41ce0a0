// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Input session: capture of incoming sysex and system data.
//!
//! The session owns the capture buffer and the start/stop lifecycle of the
//! device. Decoding what was captured is up to the caller.

use tracing::{debug, info};

use super::device::{enumerate, DeviceId, Direction};
use super::selector::Selector;
use super::subsystem::{CaptureBuffer, DeviceSubsystem, InputDevice};
use crate::error::{Error, Result};

struct OpenInput<D> {
    device: D,
    name: String,
}

/// The input half of a MIDI device session.
pub struct InputSession<D: InputDevice> {
    open: Option<OpenInput<D>>,
    capture: CaptureBuffer,
}

impl<D: InputDevice> InputSession<D> {
    pub fn new() -> Self {
        Self {
            open: None,
            capture: CaptureBuffer::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn device_name(&self) -> Option<&str> {
        self.open.as_ref().map(|o| o.name.as_str())
    }

    /// Select an input device, hand it the capture buffer and start capture.
    ///
    /// # Arguments
    /// * `subsystem` - The device subsystem to enumerate and open from
    /// * `selector` - Empty for the default device, an index, or part of a name
    ///
    /// # Returns
    /// * `Ok(())` once capture has started
    /// * `Err` if the session is open, nothing matches, or the device fails to start
    pub fn open<S>(&mut self, subsystem: &S, selector: &Selector) -> Result<()>
    where
        S: DeviceSubsystem<Input = D> + ?Sized,
    {
        if self.open.is_some() {
            return Err(Error::AlreadyOpen);
        }

        let (id, name) = if selector.is_default() {
            (DeviceId::Default, "default input".to_string())
        } else {
            let devices = enumerate(subsystem, Direction::Input);
            let id = selector
                .resolve(&devices)
                .ok_or_else(|| Error::SelectorUnresolved(selector.as_str().to_string()))?;
            let name = match id {
                DeviceId::Index(i) => devices[i].name.clone(),
                DeviceId::Default => "default input".to_string(),
            };
            info!("MIDI: selected input {}", name);
            (id, name)
        };

        self.capture.drain();
        let mut device = subsystem.open_input(id, self.capture.clone())?;
        if let Err(e) = device.prepare().and_then(|_| device.start()) {
            self.capture.set_prepared(false);
            return Err(e);
        }
        debug!("capturing from MIDI input {} ({})", id, name);

        self.open = Some(OpenInput { device, name });
        Ok(())
    }

    /// Stop capture and release the device. No-op when closed.
    pub fn close(&mut self) {
        let Some(mut open) = self.open.take() else {
            return;
        };
        open.device.stop();
        self.capture.set_prepared(false);
        debug!("closed MIDI input {}", open.name);
    }

    /// Take everything captured since the last drain.
    pub fn drain(&self) -> Vec<u8> {
        self.capture.drain()
    }

    pub fn bytes_recorded(&self) -> usize {
        self.capture.bytes_recorded()
    }

    pub fn capture(&self) -> &CaptureBuffer {
        &self.capture
    }
}

impl<D: InputDevice> Default for InputSession<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: InputDevice> Drop for InputSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}
