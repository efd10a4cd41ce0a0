// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The device subsystem seam.
//!
//! Everything platform specific lives behind these traits: enumeration,
//! opening devices, the short/long transfer primitives and input capture.
//! Device handles are closed when dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use super::device::{DeviceId, Direction};
use super::signal::CompletionSignal;
use super::ShortMessage;
use crate::error::Result;

/// Size of the input capture buffer, large enough for a full sysex dump.
pub const SYSEX_CAPTURE_SIZE: usize = 8192;

/// A platform MIDI device subsystem.
pub trait DeviceSubsystem {
    type Output: OutputDevice;
    type Input: InputDevice;

    /// Names of the devices in one direction, in enumeration order.
    fn device_names(&self, direction: Direction) -> Vec<String>;

    /// Open an output device. The device sets `completion` whenever a long
    /// transfer it accepted has finished.
    fn open_output(&self, device: DeviceId, completion: CompletionSignal) -> Result<Self::Output>;

    /// Open an input device that records incoming data into `capture`.
    fn open_input(&self, device: DeviceId, capture: CaptureBuffer) -> Result<Self::Input>;
}

/// An open output device.
pub trait OutputDevice {
    fn send_short(&mut self, message: ShortMessage) -> Result<()>;

    /// Commit the header's payload for a long transfer.
    fn prepare(&mut self, header: &mut TransferHeader) -> Result<()>;

    /// Release a prepared header. Must be a no-op for unprepared headers.
    fn unprepare(&mut self, header: &mut TransferHeader);

    /// Start a long transfer of a prepared header. On success the transfer
    /// completes asynchronously and is reported through the completion signal.
    fn submit_long(&mut self, header: &TransferHeader) -> Result<()>;
}

/// An open input device.
pub trait InputDevice {
    /// Hand the capture buffer to the device.
    fn prepare(&mut self) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
}

/// The single reusable buffer used for long (sysex) transfers.
#[derive(Debug, Default)]
pub struct TransferHeader {
    data: Vec<u8>,
    prepared: bool,
}

impl TransferHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the payload, reusing the allocation.
    ///
    /// Only valid while unprepared; the device owns a prepared header.
    pub fn load(&mut self, payload: &[u8]) {
        debug_assert!(!self.prepared, "loading a prepared transfer header");
        self.data.clear();
        self.data.extend_from_slice(payload);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Called by backends from `prepare`/`unprepare`.
    pub fn set_prepared(&mut self, prepared: bool) {
        self.prepared = prepared;
    }
}

#[derive(Debug)]
struct Capture {
    data: Vec<u8>,
    prepared: bool,
    overflowed: usize,
}

/// Fixed-size receive buffer shared with an input device.
///
/// Incoming bytes are appended while the buffer is prepared; anything past
/// [`SYSEX_CAPTURE_SIZE`] is dropped and counted.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Capture>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Capture {
                data: Vec::with_capacity(SYSEX_CAPTURE_SIZE),
                prepared: false,
                overflowed: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Capture> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_prepared(&self, prepared: bool) {
        self.lock().prepared = prepared;
    }

    pub fn is_prepared(&self) -> bool {
        self.lock().prepared
    }

    /// Record incoming bytes. Returns how many were stored.
    pub fn record(&self, bytes: &[u8]) -> usize {
        let mut capture = self.lock();
        if !capture.prepared {
            return 0;
        }
        let room = SYSEX_CAPTURE_SIZE - capture.data.len();
        let stored = bytes.len().min(room);
        capture.data.extend_from_slice(&bytes[..stored]);
        capture.overflowed += bytes.len() - stored;
        stored
    }

    pub fn bytes_recorded(&self) -> usize {
        self.lock().data.len()
    }

    /// Bytes dropped because the buffer was full.
    pub fn overflowed(&self) -> usize {
        self.lock().overflowed
    }

    /// Take everything recorded so far and re-arm the buffer.
    pub fn drain(&self) -> Vec<u8> {
        let mut capture = self.lock();
        capture.overflowed = 0;
        std::mem::replace(&mut capture.data, Vec::with_capacity(SYSEX_CAPTURE_SIZE))
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_reuses_allocation() {
        let mut header = TransferHeader::new();
        header.load(&[0xF0, 1, 2, 3, 0xF7]);
        let capacity = header.data.capacity();
        header.load(&[0xF0, 0xF7]);
        assert_eq!(header.data(), &[0xF0, 0xF7]);
        assert_eq!(header.data.capacity(), capacity);
    }

    #[test]
    fn test_capture_ignores_unprepared() {
        let capture = CaptureBuffer::new();
        assert_eq!(capture.record(&[0xF0, 0xF7]), 0);
        capture.set_prepared(true);
        assert_eq!(capture.record(&[0xF0, 0xF7]), 2);
        assert_eq!(capture.bytes_recorded(), 2);
    }

    #[test]
    fn test_capture_is_bounded() {
        let capture = CaptureBuffer::new();
        capture.set_prepared(true);
        let big = vec![0u8; SYSEX_CAPTURE_SIZE + 10];
        assert_eq!(capture.record(&big), SYSEX_CAPTURE_SIZE);
        assert_eq!(capture.overflowed(), 10);
        assert_eq!(capture.drain().len(), SYSEX_CAPTURE_SIZE);
        assert_eq!(capture.bytes_recorded(), 0);
        assert_eq!(capture.overflowed(), 0);
    }
}
