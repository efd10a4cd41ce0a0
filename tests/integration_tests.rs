// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for midi-session
//!
//! These tests drive full sessions against the in-memory subsystem, with
//! the device side completing transfers from another thread where timing
//! matters.

use std::thread;
use std::time::{Duration, Instant};

use midi_session::config::ConfigFile;
use midi_session::midi::memory::MemoryOutput;
use midi_session::midi::{DeviceId, MemorySubsystem, OutputSession};
use midi_session::{Error, MidiDevice, MidiHandler, Selector, ShortMessage};

fn two_devices() -> MemorySubsystem {
    MemorySubsystem::new()
        .with_outputs(["Microsoft GS Wavetable Synth", "USB MIDI Interface"])
        .with_inputs(["USB MIDI Interface"])
        .with_auto_complete(false)
}

/// Selector examples from a typical Windows box
#[test]
fn test_selector_resolution_scenario() {
    for (selector, expected) in [("usb", Some(1)), ("1", Some(1)), ("GS", Some(0)), ("5", None)] {
        let subsystem = two_devices();
        let mut midi = MidiDevice::new("memory", subsystem.clone());
        let opened = MidiHandler::open(&mut midi, selector);

        assert_eq!(opened, expected.is_some(), "selector {:?}", selector);
        let want: Vec<DeviceId> = expected.map(DeviceId::Index).into_iter().collect();
        assert_eq!(subsystem.opened_outputs(), want, "selector {:?}", selector);
    }
}

#[test]
fn test_default_selector_skips_enumeration() {
    let subsystem = two_devices();
    let mut midi = MidiDevice::new("memory", subsystem.clone());
    assert!(MidiHandler::open(&mut midi, ""));
    assert_eq!(subsystem.enumeration_count(), 0);
    assert_eq!(subsystem.opened_outputs(), vec![DeviceId::Default]);
}

/// The second sysex must not reuse the buffer before the first completes
#[test]
fn test_back_to_back_sysex_waits_for_device() {
    let subsystem = two_devices();
    let mut midi =
        MidiDevice::new("memory", subsystem.clone()).with_sysex_timeout(Duration::from_secs(5));
    midi.open_output(&Selector::new("usb")).unwrap();

    midi.send_sysex(&[0xF0, 0x41, 0x10, 0xF7]).unwrap();
    assert!(midi.output().transfer_pending());

    let device = subsystem.clone();
    let completer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        device.complete_transfer()
    });

    let start = Instant::now();
    midi.send_sysex(&[0xF0, 0x41, 0x11, 0xF7]).unwrap();
    let waited = start.elapsed();

    assert!(completer.join().unwrap());
    assert!(waited >= Duration::from_millis(90), "waited {:?}", waited);
    assert_eq!(
        subsystem.sysex_messages(),
        vec![vec![0xF0, 0x41, 0x10, 0xF7], vec![0xF0, 0x41, 0x11, 0xF7]]
    );
    assert!(subsystem.complete_transfer());
}

#[test]
fn test_stalled_device_times_out_and_recovers() {
    let subsystem = two_devices();
    let mut midi = MidiDevice::new("memory", subsystem.clone())
        .with_sysex_timeout(Duration::from_millis(100));
    midi.open_output(&Selector::new("0")).unwrap();

    midi.send_sysex(&[0xF0, 0x01, 0xF7]).unwrap();

    let start = Instant::now();
    let result = midi.send_sysex(&[0xF0, 0x02, 0xF7]);
    let elapsed = start.elapsed();

    assert_eq!(result, Err(Error::TransferTimeout(Duration::from_millis(100))));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    assert!(midi.output().is_open());

    // short messages still flow while the sysex is stuck
    midi.send_short(ShortMessage::control_change(0, 7, 100)).unwrap();

    subsystem.complete_transfer();
    midi.send_sysex(&[0xF0, 0x03, 0xF7]).unwrap();
    assert_eq!(subsystem.sysex_messages().len(), 2);
    assert_eq!(subsystem.short_messages().len(), 1);
}

#[test]
fn test_reopen_after_close() {
    let subsystem = two_devices();
    let mut output: OutputSession<MemoryOutput> =
        OutputSession::with_timeout(Duration::from_millis(20));

    output.close();
    output.open(&subsystem, &Selector::new("wavetable")).unwrap();
    output.close();
    output.close();
    output.open(&subsystem, &Selector::new("usb")).unwrap();

    assert_eq!(
        subsystem.opened_outputs(),
        vec![DeviceId::Index(0), DeviceId::Index(1)]
    );
    assert_eq!(subsystem.open_output_count(), 1);
}

#[test]
fn test_input_capture_lifecycle() {
    let subsystem = two_devices();
    let mut midi = MidiDevice::new("memory", subsystem.clone());

    assert!(MidiHandler::open_input(&mut midi, "usb"));
    subsystem.inject_input(&[0xF0, 0x7E, 0x00, 0x06, 0x02]);
    subsystem.inject_input(&[0x41, 0xF7]);
    assert_eq!(
        midi.drain_input(),
        vec![0xF0, 0x7E, 0x00, 0x06, 0x02, 0x41, 0xF7]
    );

    MidiHandler::close(&mut midi);
    assert_eq!(subsystem.inject_input(&[0xF8]), 0);
    assert!(midi.drain_input().is_empty());
}

#[test]
fn test_list_with_no_devices() {
    let midi = MidiDevice::new("memory", MemorySubsystem::new());
    let mut out = Vec::new();
    midi.list(&mut out).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_config_drives_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("midi.toml");
    std::fs::write(
        &path,
        "[midi]\ndevice = \"usb\"\ninput = \"0\"\nsysex_timeout_ms = 50\n",
    )
    .unwrap();

    let config = ConfigFile::load(&path).unwrap().midi;
    let subsystem = two_devices();
    let mut midi = MidiDevice::new("memory", subsystem.clone())
        .with_sysex_timeout(config.sysex_timeout());

    midi.open_output(&config.output_selector()).unwrap();
    midi.open_input(&config.input_selector().unwrap()).unwrap();
    assert_eq!(midi.output().timeout(), Duration::from_millis(50));
    assert_eq!(midi.output().device_name(), Some("USB MIDI Interface"));
    assert!(midi.input().is_open());
}
