// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use midi_session::config::{ConfigFile, MidiConfig};
use midi_session::midi::{DeviceSubsystem, MemorySubsystem};
use midi_session::{MidiDevice, MidiHandler, Selector, ShortMessage};
use tracing::debug;

fn print_usage() {
    println!("midi-session - MIDI device session tool");
    println!();
    println!("Usage: midi-session [--config <PATH>] [--virtual] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --list                      List available MIDI output devices");
    println!("  --list-inputs               List available MIDI input devices");
    println!("  --test-note [SELECTOR]      Send a test note to the selected output");
    println!("  --send-sysex <SELECTOR> <HEX>");
    println!("                              Send a sysex message, e.g. \"F0 7E 7F 09 01 F7\"");
    println!("  --monitor [SELECTOR]        Capture MIDI input from the selected device");
    println!("  --help                      Show this help message");
    println!();
    println!("Options:");
    println!("  --config <PATH>             Read device selectors and timeout from a TOML file");
    println!("  --virtual                   Use in-memory devices instead of system MIDI");
    println!();
    println!("A selector is empty (default device), a device index, or part of a device name.");
}

enum Command {
    List,
    ListInputs,
    TestNote(Option<String>),
    SendSysex(String, Vec<u8>),
    Monitor(Option<String>),
    Help,
}

struct Options {
    config: MidiConfig,
    virtual_devices: bool,
    command: Command,
}

/// Parse hex bytes, with or without separating whitespace.
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty()
        || digits.len() % 2 != 0
        || !digits.bytes().all(|b| b.is_ascii_hexdigit())
    {
        bail!("Invalid hex message: {}", text);
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| anyhow!("Invalid hex message: {}", text))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut config = MidiConfig::default();
    let mut virtual_devices = false;
    let mut rest = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a path"))?;
                config = ConfigFile::load(PathBuf::from(path))?.midi;
            }
            "--virtual" => virtual_devices = true,
            _ => rest.push(arg.as_str()),
        }
    }

    let command = match rest.as_slice() {
        [] | ["--help"] | ["-h"] => Command::Help,
        ["--list"] => Command::List,
        ["--list-inputs"] => Command::ListInputs,
        ["--test-note"] => Command::TestNote(None),
        ["--test-note", selector] => Command::TestNote(Some(selector.to_string())),
        ["--send-sysex", selector, hex] => {
            Command::SendSysex(selector.to_string(), parse_hex(hex)?)
        }
        ["--send-sysex", ..] => bail!("--send-sysex requires a selector and a hex message"),
        ["--monitor"] => Command::Monitor(None),
        ["--monitor", selector] => Command::Monitor(Some(selector.to_string())),
        [other, ..] => bail!("Unknown option: {}", other),
    };

    Ok(Options {
        config,
        virtual_devices,
        command,
    })
}

fn send_test_note<S: DeviceSubsystem>(midi: &mut MidiDevice<S>, selector: &Selector) -> Result<()> {
    midi.open_output(selector)?;
    println!(
        "Sending test note to {}...",
        midi.output().device_name().unwrap_or("unknown device")
    );

    midi.send_short(ShortMessage::note_on(0, 60, 100))?;
    println!("Note On sent");

    thread::sleep(Duration::from_millis(500));

    midi.send_short(ShortMessage::note_off(0, 60, 0))?;
    println!("Note Off sent");

    midi.close_output();
    println!("Test complete!");
    Ok(())
}

fn send_sysex<S: DeviceSubsystem>(
    midi: &mut MidiDevice<S>,
    selector: &Selector,
    sysex: &[u8],
) -> Result<()> {
    midi.open_output(selector)?;
    midi.send_sysex(sysex)?;
    println!("Sent {} bytes: {}", sysex.len(), to_hex(sysex));
    midi.close_output();
    Ok(())
}

fn monitor_input<S: DeviceSubsystem>(midi: &mut MidiDevice<S>, selector: &Selector) -> Result<()> {
    midi.open_input(selector)?;
    println!(
        "Monitoring {} for 30 seconds (press Ctrl+C to stop)...",
        midi.input().device_name().unwrap_or("unknown device")
    );
    println!();

    let start_time = Instant::now();
    let run_duration = Duration::from_secs(30);

    while start_time.elapsed() < run_duration {
        let captured = midi.drain_input();
        if !captured.is_empty() {
            println!("{}", to_hex(&captured));
        }

        // Small sleep to prevent busy-waiting
        thread::sleep(Duration::from_millis(10));
    }

    midi.close_input();
    println!();
    println!("Monitor complete!");
    Ok(())
}

fn run<S: DeviceSubsystem>(mut midi: MidiDevice<S>, options: Options) -> Result<()> {
    let config = options.config;
    let mut midi_out = io::stdout();
    let selector_or = |given: Option<String>, fallback: Selector| {
        given.map(Selector::new).unwrap_or(fallback)
    };

    match options.command {
        Command::List => midi.list(&mut midi_out)?,
        Command::ListInputs => midi.list_inputs(&mut midi_out)?,
        Command::TestNote(selector) => {
            let selector = selector_or(selector, config.output_selector());
            send_test_note(&mut midi, &selector)?;
        }
        Command::SendSysex(selector, sysex) => {
            send_sysex(&mut midi, &Selector::new(selector), &sysex)?;
        }
        Command::Monitor(selector) => {
            let fallback = config.input_selector().unwrap_or_default();
            monitor_input(&mut midi, &selector_or(selector, fallback))?;
        }
        Command::Help => print_usage(),
    }
    Ok(())
}

fn virtual_subsystem() -> MemorySubsystem {
    MemorySubsystem::new()
        .with_outputs(["Virtual Wavetable Synth", "Virtual USB MIDI Interface"])
        .with_inputs(["Virtual USB MIDI Interface"])
}

#[cfg(target_os = "macos")]
fn run_system(options: Options) -> Result<()> {
    let timeout = options.config.sysex_timeout();
    let midi = MidiDevice::new("coremidi", midi_session::midi::CoreMidiSubsystem::default())
        .with_sysex_timeout(timeout);
    run(midi, options)
}

#[cfg(all(not(target_os = "macos"), feature = "midir"))]
fn run_system(options: Options) -> Result<()> {
    let timeout = options.config.sysex_timeout();
    let midi = MidiDevice::new("midir", midi_session::midi::MidirSubsystem::default())
        .with_sysex_timeout(timeout);
    run(midi, options)
}

#[cfg(all(not(target_os = "macos"), not(feature = "midir")))]
fn run_system(options: Options) -> Result<()> {
    tracing::warn!("built without a system MIDI backend, using virtual devices");
    let timeout = options.config.sysex_timeout();
    let midi = MidiDevice::new("memory", virtual_subsystem()).with_sysex_timeout(timeout);
    run(midi, options)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(&args)?;
    debug!("sysex timeout {:?}", options.config.sysex_timeout());

    if options.virtual_devices {
        let timeout = options.config.sysex_timeout();
        let midi = MidiDevice::new("memory", virtual_subsystem()).with_sysex_timeout(timeout);
        return run(midi, options);
    }
    run_system(options)
}
