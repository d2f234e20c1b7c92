// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line front end: decode a logic-analyser capture of a 6809/6309
//! bus and print the annotated disassembly.

use m6809::driver::{Config, Driver};
use m6809::memory_access::TraceMemory;
use m6809::sample::{CaptureFile, PinMap};
use m6809::CpuType;

use clap::{Parser, ValueEnum};
use simple_logger::SimpleLogger;

use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CpuArg {
    #[value(name = "6809")]
    M6809,
    #[value(name = "6809e")]
    M6809E,
    #[value(name = "6309")]
    M6309,
    #[value(name = "6309e")]
    M6309E,
}

impl From<CpuArg> for CpuType {
    fn from(cpu: CpuArg) -> Self {
        match cpu {
            CpuArg::M6809 => CpuType::Cpu6809,
            CpuArg::M6809E => CpuType::Cpu6809E,
            CpuArg::M6309 => CpuType::Cpu6309,
            CpuArg::M6309E => CpuType::Cpu6309E,
        }
    }
}

fn parse_hex16(value: &str) -> Result<u16, String> {
    let trimmed = value.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(trimmed, 16).map_err(|e| format!("bad hex address {:?}: {}", value, e))
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture file: a stream of 16-bits little-endian samples (or plain
    /// bytes with --byte), one per E-clock cycle.
    file: PathBuf,

    /// CPU whose trace this is.
    #[arg(long, value_enum, default_value = "6809e")]
    cpu: CpuArg,

    /// The capture carries only the 8-bits data bus.
    #[arg(long)]
    byte: bool,

    /// Show sample numbers.
    #[arg(long)]
    samplenums: bool,

    /// Show per-instruction cycle counts.
    #[arg(long)]
    cycles: bool,

    /// Hide instruction addresses.
    #[arg(long)]
    no_address: bool,

    /// Hide instruction hex bytes.
    #[arg(long)]
    no_hex: bool,

    /// Hide the predicted register state.
    #[arg(long)]
    no_state: bool,

    /// Arm output when this PC is reached (hex).
    #[arg(long, value_parser = parse_hex16)]
    trigger_start: Option<u16>,

    /// Disarm output when this PC is reached (hex).
    #[arg(long, value_parser = parse_hex16)]
    trigger_stop: Option<u16>,

    /// Emulate interrupt entries without printing them.
    #[arg(long)]
    skipint: bool,

    /// Memory modelling bitmask (1=instr, 2=pointer, 4=data, 8=stack).
    #[arg(long, default_value_t = 0)]
    mem: u8,

    /// Memory read logging bitmask.
    #[arg(long, default_value_t = 0)]
    rd_log: u8,

    /// Memory write logging bitmask.
    #[arg(long, default_value_t = 0)]
    wr_log: u8,

    /// Verbose diagnostics.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    SimpleLogger::new()
        .with_level(if args.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init()?;

    let config = Config {
        cpu: args.cpu.into(),
        show_samplenums: args.samplenums,
        show_cycles: args.cycles,
        show_address: !args.no_address,
        show_hex: !args.no_hex,
        show_state: !args.no_state,
        trigger_start: args.trigger_start,
        trigger_stop: args.trigger_stop,
        trigger_skipint: args.skipint,
    };

    let mut source = if args.byte {
        CaptureFile::open_byte(&args.file)?
    } else {
        CaptureFile::open(&args.file, PinMap::default())?
    };

    let mut memory = TraceMemory::new();
    memory.set_modelling(args.mem);
    memory.set_rd_logging(args.rd_log);
    memory.set_wr_logging(args.wr_log);

    let mut driver = Driver::new(config, memory);
    let summary = driver.run(&mut source, &mut |line| println!("{}", line));

    eprintln!(
        "{} instructions, {} prediction failures, {} LIC boundaries, {} computed boundaries{}",
        summary.instructions,
        summary.fails,
        summary.lic_boundaries,
        summary.computed_boundaries,
        if summary.truncated { ", trace truncated" } else { "" },
    );

    Ok(())
}
