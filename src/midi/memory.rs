// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-memory device subsystem.
//!
//! Behaves like a platform subsystem without touching hardware: devices
//! have names and can be marked busy, long transfers complete either
//! immediately or when [`MemorySubsystem::complete_transfer`] is called,
//! and input can be injected. All traffic is recorded for inspection.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::device::{DeviceId, Direction};
use super::signal::CompletionSignal;
use super::subsystem::{CaptureBuffer, DeviceSubsystem, InputDevice, OutputDevice, TransferHeader};
use super::ShortMessage;
use crate::error::{Error, Result};

#[derive(Debug)]
struct State {
    outputs: Vec<String>,
    inputs: Vec<String>,
    busy: HashSet<DeviceId>,
    auto_complete: bool,
    recording: bool,
    fail_prepare: bool,
    fail_submit: bool,
    enumerations: usize,
    opened_outputs: Vec<DeviceId>,
    open_outputs: usize,
    short_messages: Vec<ShortMessage>,
    sysex_messages: Vec<Vec<u8>>,
    pending: Option<CompletionSignal>,
    capture: Option<CaptureBuffer>,
    capturing: bool,
}

/// A scriptable, cloneable device subsystem. Clones share state.
#[derive(Debug, Clone)]
pub struct MemorySubsystem {
    state: Arc<Mutex<State>>,
}

impl MemorySubsystem {
    /// No devices; transfers complete as soon as they are submitted.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                outputs: Vec::new(),
                inputs: Vec::new(),
                busy: HashSet::new(),
                auto_complete: true,
                recording: true,
                fail_prepare: false,
                fail_submit: false,
                enumerations: 0,
                opened_outputs: Vec::new(),
                open_outputs: 0,
                short_messages: Vec::new(),
                sysex_messages: Vec::new(),
                pending: None,
                capture: None,
                capturing: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_outputs<I, N>(self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.lock().outputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_inputs<I, N>(self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.lock().inputs = names.into_iter().map(Into::into).collect();
        self
    }

    /// Make opening `device` fail as if another program held it.
    pub fn with_busy(self, device: DeviceId) -> Self {
        self.lock().busy.insert(device);
        self
    }

    /// When false, submitted transfers stay in flight until
    /// [`Self::complete_transfer`].
    pub fn with_auto_complete(self, auto_complete: bool) -> Self {
        self.lock().auto_complete = auto_complete;
        self
    }

    /// When false, sent messages are not kept (for long-running loops).
    pub fn with_recording(self, recording: bool) -> Self {
        self.lock().recording = recording;
        self
    }

    pub fn set_fail_prepare(&self, fail: bool) {
        self.lock().fail_prepare = fail;
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.lock().fail_submit = fail;
    }

    /// Finish the in-flight long transfer. Returns false if none was pending.
    pub fn complete_transfer(&self) -> bool {
        let pending = self.lock().pending.take();
        match pending {
            Some(signal) => {
                signal.set();
                true
            }
            None => false,
        }
    }

    /// Feed bytes to the open input device. Returns how many were captured.
    pub fn inject_input(&self, bytes: &[u8]) -> usize {
        let capture = {
            let state = self.lock();
            if !state.capturing {
                return 0;
            }
            state.capture.clone()
        };
        capture.map_or(0, |c| c.record(bytes))
    }

    /// How many times device names were enumerated.
    pub fn enumeration_count(&self) -> usize {
        self.lock().enumerations
    }

    /// Every output device opened so far, in order.
    pub fn opened_outputs(&self) -> Vec<DeviceId> {
        self.lock().opened_outputs.clone()
    }

    /// Output devices currently open.
    pub fn open_output_count(&self) -> usize {
        self.lock().open_outputs
    }

    pub fn short_messages(&self) -> Vec<ShortMessage> {
        self.lock().short_messages.clone()
    }

    pub fn sysex_messages(&self) -> Vec<Vec<u8>> {
        self.lock().sysex_messages.clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().capturing
    }

    fn check_device(&self, device: DeviceId, count: usize) -> Result<()> {
        let state = self.lock();
        if state.busy.contains(&device) {
            return Err(Error::DeviceOpenFailed {
                device: device.to_string(),
                reason: "device is already allocated".to_string(),
            });
        }
        if let DeviceId::Index(i) = device {
            if i >= count {
                return Err(Error::DeviceOpenFailed {
                    device: device.to_string(),
                    reason: "bad device id".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for MemorySubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSubsystem for MemorySubsystem {
    type Output = MemoryOutput;
    type Input = MemoryInput;

    fn device_names(&self, direction: Direction) -> Vec<String> {
        let mut state = self.lock();
        state.enumerations += 1;
        match direction {
            Direction::Output => state.outputs.clone(),
            Direction::Input => state.inputs.clone(),
        }
    }

    fn open_output(&self, device: DeviceId, completion: CompletionSignal) -> Result<MemoryOutput> {
        let count = self.lock().outputs.len();
        self.check_device(device, count)?;

        let mut state = self.lock();
        state.opened_outputs.push(device);
        state.open_outputs += 1;
        Ok(MemoryOutput {
            state: self.state.clone(),
            completion,
        })
    }

    fn open_input(&self, device: DeviceId, capture: CaptureBuffer) -> Result<MemoryInput> {
        let count = self.lock().inputs.len();
        self.check_device(device, count)?;

        self.lock().capture = Some(capture.clone());
        Ok(MemoryInput {
            state: self.state.clone(),
            capture,
        })
    }
}

/// Output handle from [`MemorySubsystem`].
#[derive(Debug)]
pub struct MemoryOutput {
    state: Arc<Mutex<State>>,
    completion: CompletionSignal,
}

impl MemoryOutput {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputDevice for MemoryOutput {
    fn send_short(&mut self, message: ShortMessage) -> Result<()> {
        let mut state = self.lock();
        if state.recording {
            state.short_messages.push(message);
        }
        Ok(())
    }

    fn prepare(&mut self, header: &mut TransferHeader) -> Result<()> {
        if self.lock().fail_prepare {
            return Err(Error::TransferPrepareFailed("injected failure".to_string()));
        }
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
        let mut state = self.lock();
        if state.fail_submit {
            return Err(Error::TransferSubmitFailed("injected failure".to_string()));
        }
        if !header.is_prepared() {
            return Err(Error::TransferSubmitFailed("header not prepared".to_string()));
        }
        if state.recording {
            state.sysex_messages.push(header.data().to_vec());
        }
        if state.auto_complete {
            drop(state);
            self.completion.set();
        } else {
            state.pending = Some(self.completion.clone());
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.open_outputs = state.open_outputs.saturating_sub(1);
        state.pending = None;
    }
}

/// Input handle from [`MemorySubsystem`].
#[derive(Debug)]
pub struct MemoryInput {
    state: Arc<Mutex<State>>,
    capture: CaptureBuffer,
}

impl MemoryInput {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InputDevice for MemoryInput {
    fn prepare(&mut self) -> Result<()> {
        self.capture.set_prepared(true);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.lock().capturing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().capturing = false;
    }
}

impl Drop for MemoryInput {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.capturing = false;
        state.capture = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_opens_without_devices() {
        let subsystem = MemorySubsystem::new();
        let output = subsystem.open_output(DeviceId::Default, CompletionSignal::new());
        assert!(output.is_ok());
        assert_eq!(subsystem.open_output_count(), 1);
        drop(output);
        assert_eq!(subsystem.open_output_count(), 0);
    }

    #[test]
    fn test_bad_index_is_rejected() {
        let subsystem = MemorySubsystem::new().with_outputs(["Synth"]);
        let result = subsystem.open_output(DeviceId::Index(1), CompletionSignal::new());
        assert!(matches!(result, Err(Error::DeviceOpenFailed { .. })));
    }

    #[test]
    fn test_manual_completion() {
        let subsystem = MemorySubsystem::new().with_auto_complete(false);
        let signal = CompletionSignal::new();
        let mut output = subsystem
            .open_output(DeviceId::Default, signal.clone())
            .unwrap();

        let mut header = TransferHeader::new();
        header.load(&[0xF0, 0xF7]);
        output.prepare(&mut header).unwrap();
        signal.reset();
        output.submit_long(&header).unwrap();

        assert!(!signal.is_available());
        assert!(subsystem.complete_transfer());
        assert!(signal.is_available());
        assert!(!subsystem.complete_transfer());
    }
}
