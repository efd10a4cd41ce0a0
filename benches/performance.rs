// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for midi-session
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Selector resolution against device lists of various sizes
//! - The sysex transfer handshake with an immediately completing device

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use midi_session::midi::{DeviceDescriptor, MemorySubsystem};
use midi_session::{MidiDevice, Selector, ShortMessage};

fn device_list(size: usize) -> Vec<DeviceDescriptor> {
    (0..size)
        .map(|index| DeviceDescriptor {
            index,
            name: format!("MIDI Device Port {}", index),
        })
        .collect()
}

/// Benchmark selector resolution (index and name search)
fn bench_selector_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector");

    for size in [4, 64, 1024].iter() {
        let devices = device_list(*size);
        let by_index = Selector::new((size - 1).to_string());
        let by_name = Selector::new(format!("port {}", size - 1));

        group.bench_with_input(BenchmarkId::new("index", size), &devices, |b, devices| {
            b.iter(|| black_box(by_index.resolve(black_box(devices))))
        });

        group.bench_with_input(BenchmarkId::new("name", size), &devices, |b, devices| {
            b.iter(|| black_box(by_name.resolve(black_box(devices))))
        });
    }

    group.finish();
}

/// Benchmark the sysex handshake and short sends
fn bench_transfers(c: &mut Criterion) {
    let subsystem = MemorySubsystem::new()
        .with_outputs(["Synth"])
        .with_recording(false);
    let mut midi = MidiDevice::new("memory", subsystem);
    if midi.open_output(&Selector::new("synth")).is_err() {
        return;
    }

    let sysex: Vec<u8> = std::iter::once(0xF0)
        .chain((0..254).map(|i| (i % 128) as u8))
        .chain(std::iter::once(0xF7))
        .collect();

    c.bench_function("send_sysex_256", |b| {
        b.iter(|| midi.send_sysex(black_box(&sysex)))
    });

    c.bench_function("send_short", |b| {
        b.iter(|| midi.send_short(black_box(ShortMessage::note_on(0, 60, 100))))
    });
}

criterion_group!(benches, bench_selector_resolution, bench_transfers);
criterion_main!(benches);
