//! Benchmarks for navigation packet decoding
//!
//! Covers the per-packet cost on the navdata worker thread:
//! - decoding a demo-mode packet with its checksum option
//! - rejecting garbage early (bad magic)
//! - unpacking the control-state word
//!
//! Platform: Cross-platform (synthetic packets, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use dronewire::navdata::{self, ControlState};
use dronewire::test_utils::{navdata_bytes, sample_navdata};
use std::hint::black_box;

fn bench_decode(c: &mut Criterion) {
    let packet = navdata_bytes(&sample_navdata());

    let mut group = c.benchmark_group("navdata_decode");
    group.throughput(Throughput::Bytes(packet.len() as u64));

    group.bench_function("demo_packet", |b| {
        b.iter(|| black_box(navdata::decode(black_box(&packet))))
    });

    let mut garbage = packet.clone();
    garbage[0] ^= 0xFF;
    group.bench_function("bad_magic", |b| {
        b.iter(|| black_box(navdata::decode(black_box(&garbage)).is_err()))
    });

    group.finish();
}

fn bench_control_state(c: &mut Criterion) {
    c.bench_function("control_state_from_word", |b| {
        b.iter(|| black_box(ControlState::from_word(black_box(0x0004_0001))))
    });
}

criterion_group!(benches, bench_decode, bench_control_state);
criterion_main!(benches);
