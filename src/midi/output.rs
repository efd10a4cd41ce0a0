// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Output session: device selection and the transfer handshake.
//!
//! Short messages go straight to the device. Sysex messages go through one
//! reusable [`TransferHeader`]; the [`CompletionSignal`] tracks whether the
//! device still owns it, so at most one sysex transfer is in flight.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::device::{enumerate, DeviceId, Direction};
use super::selector::Selector;
use super::signal::CompletionSignal;
use super::subsystem::{DeviceSubsystem, OutputDevice, TransferHeader};
use super::ShortMessage;
use crate::error::{Error, Result};

/// How long a sysex send waits for the previous transfer to finish.
pub const DEFAULT_SYSEX_TIMEOUT: Duration = Duration::from_millis(2000);

struct OpenOutput<D> {
    device: D,
    name: String,
    header: TransferHeader,
    completion: CompletionSignal,
}

/// The output half of a MIDI device session.
pub struct OutputSession<D: OutputDevice> {
    open: Option<OpenOutput<D>>,
    timeout: Duration,
}

impl<D: OutputDevice> OutputSession<D> {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_SYSEX_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            open: None,
            timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Name of the open device, if any.
    pub fn device_name(&self) -> Option<&str> {
        self.open.as_ref().map(|o| o.name.as_str())
    }

    /// True while a sysex transfer has been submitted but not completed.
    pub fn transfer_pending(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|o| !o.completion.is_available())
    }

    /// Select and open an output device.
    ///
    /// Fails without touching the session if it is already open, the
    /// selector matches nothing, or the subsystem refuses the device.
    ///
    /// # Arguments
    /// * `subsystem` - The device subsystem to enumerate and open from
    /// * `selector` - Empty for the default device, an index, or part of a name
    ///
    /// # Returns
    /// * `Ok(())` once the device is open
    /// * `Err(Error::AlreadyOpen)`, `Err(Error::SelectorUnresolved)` or
    ///   `Err(Error::DeviceOpenFailed)` otherwise
    pub fn open<S>(&mut self, subsystem: &S, selector: &Selector) -> Result<()>
    where
        S: DeviceSubsystem<Output = D> + ?Sized,
    {
        if self.open.is_some() {
            return Err(Error::AlreadyOpen);
        }

        let (id, name) = if selector.is_default() {
            (DeviceId::Default, "default output".to_string())
        } else {
            let devices = enumerate(subsystem, Direction::Output);
            let id = selector
                .resolve(&devices)
                .ok_or_else(|| Error::SelectorUnresolved(selector.as_str().to_string()))?;
            let name = match id {
                DeviceId::Index(i) => devices[i].name.clone(),
                DeviceId::Default => "default output".to_string(),
            };
            info!("MIDI: selected output {}", name);
            (id, name)
        };

        let completion = CompletionSignal::new();
        let device = subsystem.open_output(id, completion.clone())?;
        debug!("opened MIDI output {} ({})", id, name);

        self.open = Some(OpenOutput {
            device,
            name,
            header: TransferHeader::new(),
            completion,
        });
        Ok(())
    }

    /// Release the device. No-op when closed.
    ///
    /// An in-flight sysex transfer gets up to the session timeout to finish
    /// before the header and device are released.
    pub fn close(&mut self) {
        let Some(mut open) = self.open.take() else {
            return;
        };

        if !open.completion.wait(self.timeout) {
            warn!(
                "closing MIDI output {} with a sysex transfer still in flight",
                open.name
            );
        }
        open.device.unprepare(&mut open.header);
        debug!("closed MIDI output {}", open.name);
    }

    /// Send a short message directly to the device.
    pub fn send_short(&mut self, message: ShortMessage) -> Result<()> {
        let open = self.open.as_mut().ok_or(Error::NotOpen)?;
        open.device.send_short(message)
    }

    /// Send a sysex message through the shared transfer header.
    ///
    /// Returns once the transfer is submitted; completion is observed by the
    /// next call. A timeout leaves the session open and usable.
    ///
    /// # Arguments
    /// * `sysex` - The complete message, copied into the transfer header
    ///
    /// # Returns
    /// * `Ok(())` once the device has accepted the transfer
    /// * `Err(Error::TransferTimeout)` if the previous transfer never completed
    /// * `Err(Error::TransferPrepareFailed)` or `Err(Error::TransferSubmitFailed)`
    ///   if the device rejected the header
    pub fn send_sysex(&mut self, sysex: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let open = self.open.as_mut().ok_or(Error::NotOpen)?;

        if !open.completion.wait(timeout) {
            error!("MIDI: can't send sysex message, previous transfer did not complete");
            return Err(Error::TransferTimeout(timeout));
        }

        open.device.unprepare(&mut open.header);
        open.header.load(sysex);

        if let Err(e) = open.device.prepare(&mut open.header) {
            warn!("MIDI: {}", e);
            return Err(e);
        }

        open.completion.reset();
        if let Err(e) = open.device.submit_long(&open.header) {
            // no completion will ever arrive for a transfer that never started
            open.completion.set();
            warn!("MIDI: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

impl<D: OutputDevice> Default for OutputSession<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: OutputDevice> Drop for OutputSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::memory::{MemoryOutput, MemorySubsystem};
    use std::time::Instant;

    fn subsystem() -> MemorySubsystem {
        MemorySubsystem::new()
            .with_outputs(["Microsoft GS Wavetable Synth", "USB MIDI Interface"])
            .with_auto_complete(false)
    }

    fn session() -> OutputSession<MemoryOutput> {
        OutputSession::with_timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_open_by_name() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"usb".into()).unwrap();
        assert!(output.is_open());
        assert_eq!(output.device_name(), Some("USB MIDI Interface"));
        assert_eq!(subsystem.opened_outputs(), vec![DeviceId::Index(1)]);
    }

    #[test]
    fn test_open_default_does_not_enumerate() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"".into()).unwrap();
        assert_eq!(subsystem.enumeration_count(), 0);
        assert_eq!(subsystem.opened_outputs(), vec![DeviceId::Default]);
    }

    #[test]
    fn test_open_twice_fails_and_keeps_first() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"0".into()).unwrap();
        assert_eq!(output.open(&subsystem, &"1".into()), Err(Error::AlreadyOpen));
        assert_eq!(output.device_name(), Some("Microsoft GS Wavetable Synth"));
        assert_eq!(subsystem.open_output_count(), 1);

        output.send_short(ShortMessage::note_on(0, 60, 100)).unwrap();
        assert_eq!(subsystem.short_messages().len(), 1);
    }

    #[test]
    fn test_unresolved_selector_leaves_session_closed() {
        let subsystem = subsystem();
        let mut output = session();
        assert_eq!(
            output.open(&subsystem, &"5".into()),
            Err(Error::SelectorUnresolved("5".to_string()))
        );
        assert!(!output.is_open());
        assert_eq!(subsystem.open_output_count(), 0);
    }

    #[test]
    fn test_busy_device_leaves_session_closed() {
        let subsystem = subsystem().with_busy(DeviceId::Index(1));
        let mut output = session();
        assert!(matches!(
            output.open(&subsystem, &"1".into()),
            Err(Error::DeviceOpenFailed { .. })
        ));
        assert!(!output.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let subsystem = subsystem();
        let mut output = session();
        output.close();
        output.open(&subsystem, &"".into()).unwrap();
        output.close();
        output.close();
        assert!(!output.is_open());
        assert_eq!(subsystem.open_output_count(), 0);
    }

    #[test]
    fn test_send_on_closed_session() {
        let mut output = session();
        assert_eq!(output.send_sysex(&[0xF0, 0xF7]), Err(Error::NotOpen));
        assert_eq!(
            output.send_short(ShortMessage::note_off(0, 60, 0)),
            Err(Error::NotOpen)
        );
    }

    #[test]
    fn test_second_sysex_waits_for_completion() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"usb".into()).unwrap();

        output.send_sysex(&[0xF0, 0x41, 0xF7]).unwrap();
        assert!(output.transfer_pending());

        let start = Instant::now();
        assert_eq!(
            output.send_sysex(&[0xF0, 0x42, 0xF7]),
            Err(Error::TransferTimeout(Duration::from_millis(50)))
        );
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(subsystem.sysex_messages(), vec![vec![0xF0, 0x41, 0xF7]]);

        assert!(subsystem.complete_transfer());
        output.send_sysex(&[0xF0, 0x43, 0xF7]).unwrap();
        assert_eq!(subsystem.sysex_messages().len(), 2);
        assert!(output.is_open());
    }

    #[test]
    fn test_short_messages_bypass_pending_transfer() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"".into()).unwrap();

        output.send_sysex(&[0xF0, 0x7E, 0xF7]).unwrap();
        output.send_short(ShortMessage::note_on(1, 64, 90)).unwrap();
        assert!(output.transfer_pending());
        assert_eq!(subsystem.short_messages(), vec![ShortMessage::note_on(1, 64, 90)]);
    }

    #[test]
    fn test_prepare_failure_keeps_signal_available() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"".into()).unwrap();

        subsystem.set_fail_prepare(true);
        assert!(matches!(
            output.send_sysex(&[0xF0, 0xF7]),
            Err(Error::TransferPrepareFailed(_))
        ));
        assert!(!output.transfer_pending());

        subsystem.set_fail_prepare(false);
        output.send_sysex(&[0xF0, 0xF7]).unwrap();
        assert_eq!(subsystem.sysex_messages().len(), 1);
    }

    #[test]
    fn test_submit_failure_restores_signal() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"".into()).unwrap();

        subsystem.set_fail_submit(true);
        assert!(matches!(
            output.send_sysex(&[0xF0, 0xF7]),
            Err(Error::TransferSubmitFailed(_))
        ));
        assert!(!output.transfer_pending());

        subsystem.set_fail_submit(false);
        let start = Instant::now();
        output.send_sysex(&[0xF0, 0xF7]).unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_close_with_transfer_in_flight() {
        let subsystem = subsystem();
        let mut output = session();
        output.open(&subsystem, &"".into()).unwrap();
        output.send_sysex(&[0xF0, 0xF7]).unwrap();
        assert!(output.transfer_pending());

        let start = Instant::now();
        output.close();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "closed after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(1), "closed after {:?}", elapsed);
        assert!(!output.is_open());
        assert_eq!(subsystem.open_output_count(), 0);

        // reopening gives a fresh, available signal
        output.open(&subsystem, &"".into()).unwrap();
        assert!(!output.transfer_pending());
    }
}
