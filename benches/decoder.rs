//! Benchmark for the trace decode loop.
//!
//! Make sure the result of the benchmarked function is used,
//! whether by sending it to black_box, or to return it from the closure.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use m6809::driver::{Config, Driver};
use m6809::memory_access::TraceMemory;
use m6809::sample::{Sample, SliceSource};
use m6809::CpuType;

/// A LIC-tagged trace looping over a small mix of instruction shapes.
fn build_trace(repeats: usize) -> Vec<Sample> {
    let cycle = |data: u8, write: bool, last: bool| Sample {
        data,
        rnw: Some(!write),
        lic: Some(last),
        bs: Some(false),
        ..Sample::default()
    };
    let r = |data| cycle(data, false, false);
    let rl = |data| cycle(data, false, true);
    let wl = |data| cycle(data, true, true);

    let block = [
        r(0x86), rl(0x42),                                // LDA #$42
        r(0x8E), r(0x20), rl(0x00),                       // LDX #$2000
        r(0xA6), r(0x84), r(0xFF), rl(0x7F),              // LDA ,X
        r(0xB7), r(0x30), r(0x00), r(0xFF), wl(0x7F),     // STA $3000
        r(0x20), r(0xFE), rl(0xFF),                       // BRA *
    ];

    let mut trace = Vec::with_capacity(block.len() * repeats);
    for _ in 0..repeats {
        trace.extend_from_slice(&block);
    }
    for (i, sample) in trace.iter_mut().enumerate() {
        sample.seq = i as u32;
    }
    trace
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let trace = build_trace(1000);

    c.bench_function("decode_trace", |b| {
        b.iter(|| {
            let mut source = SliceSource::new(black_box(&trace));
            let config = Config { cpu: CpuType::Cpu6809E, show_state: false, ..Config::default() };
            let mut driver = Driver::new(config, TraceMemory::new());
            driver.cpu_mut().regs.pc = Some(0x1000);
            let mut sink = |line: &str| {
                black_box(line.len());
            };
            black_box(driver.run(&mut source, &mut sink))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
