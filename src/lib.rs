// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motorola 6809/Hitachi 6309 bus-trace decoder, disassembler and reference
//! emulator.
//!
//! This library consumes a stream of per-cycle bus samples captured by a
//! logic analyser (data byte plus optional RnW/LIC/BS/BA/A0 control lines)
//! and produces a disassembly annotated with the predicted processor state.
//! A reference emulator re-executes every decoded instruction against the
//! captured samples and cross-checks each observable it can predict; any
//! disagreement taints the affected state as unknown and is flagged on the
//! output line.
//!
//! # How to use
//!
//! Implement [SampleSource](sample::SampleSource) for your capture (or use
//! the provided [CaptureFile](sample::CaptureFile)), pick the memory model
//! through the [MemoryAccess](memory_access::MemoryAccess) trait, and feed
//! both to a [Driver](driver::Driver):
//!
//! ```ignore
//! let config = Config { cpu: CpuType::Cpu6809E, ..Config::default() };
//! let mut source = CaptureFile::open("capture.bin", PinMap::default())?;
//! let mut driver = Driver::new(config, TraceMemory::new());
//! driver.run(&mut source, &mut |line| println!("{}", line))?;
//! ```
//!
//! Since the capture may begin mid-stream, every register and flag is
//! tri-state (`Option`): born unknown, learned from the trace, and reverted
//! to unknown whenever the emulator and the capture disagree.

pub mod addressing_modes;
pub mod cpu_details;
pub mod disassembler;
pub mod driver;
pub mod exception;
pub mod instruction;
mod interpreter;
pub mod isa;
pub mod memory_access;
pub mod queue;
pub mod sample;
pub mod status_register;
pub mod utils;

pub use driver::{Config, Driver};

use status_register::{ModeRegister, StatusRegister};
use utils::{hex2, hex4, zip_map};

/// The CPU type whose traces are decoded.
///
/// The `E` variants surface LIC and an externally clocked E signal, making
/// instruction boundaries exact; otherwise they behave identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuType {
    Cpu6809,
    Cpu6809E,
    Cpu6309,
    Cpu6309E,
}

impl CpuType {
    /// True when the 6309 extension set is active.
    pub const fn is_6309(self) -> bool {
        matches!(self, Self::Cpu6309 | Self::Cpu6309E)
    }

    /// True for the externally clocked variants, whose captures carry LIC.
    pub const fn is_e(self) -> bool {
        matches!(self, Self::Cpu6809E | Self::Cpu6309E)
    }
}

/// The 6809/6309 register file, tri-state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: Option<u8>,
    pub b: Option<u8>,
    /// 6309 only.
    pub e: Option<u8>,
    /// 6309 only.
    pub f: Option<u8>,
    pub x: Option<u16>,
    pub y: Option<u16>,
    pub u: Option<u16>,
    pub s: Option<u16>,
    pub dp: Option<u8>,
    pub pc: Option<u16>,
    /// 6309 transfer register.
    pub v: Option<u16>,
    pub cc: StatusRegister,
    /// 6309 mode register.
    pub md: ModeRegister,
}

impl Registers {
    /// The all-unknown register file, the state a mid-stream capture
    /// starts from.
    pub const UNKNOWN: Self = Self {
        a: None,
        b: None,
        e: None,
        f: None,
        x: None,
        y: None,
        u: None,
        s: None,
        dp: None,
        pc: None,
        v: None,
        cc: StatusRegister::UNKNOWN,
        md: ModeRegister::UNKNOWN,
    };

    /// The D accumulator (A:B), known only when both halves are.
    pub fn d(&self) -> Option<u16> {
        zip_map(self.a.map(|a| a as u16), self.b.map(|b| b as u16), |a, b| a << 8 | b)
    }

    pub fn set_d(&mut self, d: Option<u16>) {
        self.a = d.map(|d| (d >> 8) as u8);
        self.b = d.map(|d| d as u8);
    }

    /// The 6309 W accumulator (E:F).
    pub fn w(&self) -> Option<u16> {
        zip_map(self.e.map(|e| e as u16), self.f.map(|f| f as u16), |e, f| e << 8 | f)
    }

    pub fn set_w(&mut self, w: Option<u16>) {
        self.e = w.map(|w| (w >> 8) as u8);
        self.f = w.map(|w| w as u8);
    }

    /// The 6309 Q accumulator (D:W).
    pub fn q(&self) -> Option<u32> {
        zip_map(self.d().map(|d| d as u32), self.w().map(|w| w as u32), |d, w| d << 16 | w)
    }

    pub fn set_q(&mut self, q: Option<u32>) {
        self.set_d(q.map(|q| (q >> 16) as u16));
        self.set_w(q.map(|q| q as u16));
    }

    /// Reads an inter-register code (TFR/EXG/ADDR.. post-byte nibble) as a
    /// 16-bits value. 8-bits registers read with `$FF` in the high byte, the
    /// way a 6809 drives the unused half of the bus.
    pub fn get_inter(&self, code: u8, cpu: CpuType) -> Option<u16> {
        let wide8 = |r: Option<u8>| r.map(|v| 0xFF00 | v as u16);
        match code & 0x0F {
            0x0 => self.d(),
            0x1 => self.x,
            0x2 => self.y,
            0x3 => self.u,
            0x4 => self.s,
            0x5 => self.pc,
            0x6 if cpu.is_6309() => self.w(),
            0x7 if cpu.is_6309() => self.v,
            0x8 => wide8(self.a),
            0x9 => wide8(self.b),
            0xA => wide8(self.cc.as_byte()),
            0xB => wide8(self.dp),
            0xC | 0xD if cpu.is_6309() => Some(0),
            0xE if cpu.is_6309() => wide8(self.e),
            0xF if cpu.is_6309() => wide8(self.f),
            _ => None,
        }
    }

    /// Writes an inter-register code. 8-bits registers take the low byte.
    pub fn set_inter(&mut self, code: u8, value: Option<u16>, cpu: CpuType) {
        let low = value.map(|v| v as u8);
        match code & 0x0F {
            0x0 => self.set_d(value),
            0x1 => self.x = value,
            0x2 => self.y = value,
            0x3 => self.u = value,
            0x4 => self.s = value,
            0x5 => self.pc = value,
            0x6 if cpu.is_6309() => self.set_w(value),
            0x7 if cpu.is_6309() => self.v = value,
            0x8 => self.a = low,
            0x9 => self.b = low,
            0xA => match low {
                Some(cc) => self.cc.set_all(cc),
                None => self.cc = StatusRegister::UNKNOWN,
            },
            0xB => self.dp = low,
            0xE if cpu.is_6309() => self.e = low,
            0xF if cpu.is_6309() => self.f = low,
            _ => {}
        }
    }

    /// Renders the register file, `?` for unknown digits.
    pub fn render(&self, cpu: CpuType) -> String {
        let mut state = format!(
            "A={} B={} X={} Y={} U={} S={} DP={}",
            hex2(self.a),
            hex2(self.b),
            hex4(self.x),
            hex4(self.y),
            hex4(self.u),
            hex4(self.s),
            hex2(self.dp),
        );
        if cpu.is_6309() {
            state.push_str(&format!(
                " E={} F={} V={}",
                hex2(self.e),
                hex2(self.f),
                hex4(self.v),
            ));
        }
        state.push_str(&format!(" CC={}", self.cc.render()));
        state
    }
}

/// A 6809/6309 reference emulator core.
///
/// The core never fetches for itself: it is driven by the captured samples
/// of each instruction and only predicts what the bus should have carried.
#[derive(Clone, Debug)]
pub struct M6809 {
    pub regs: Registers,
    pub cpu_type: CpuType,
    /// Set when a prediction diverged from the capture within the current
    /// instruction.
    failflag: bool,
    instruction_count: u64,
    fail_count: u64,
}

impl M6809 {
    /// Creates a core with entirely unknown state, waiting for a reset or
    /// for the trace to reveal values.
    pub fn new(cpu_type: CpuType) -> Self {
        Self {
            regs: Registers::UNKNOWN,
            cpu_type,
            failflag: false,
            instruction_count: 0,
            fail_count: 0,
        }
    }

    /// Reads and clears the per-instruction divergence flag. The driver
    /// samples this at every instruction boundary.
    pub fn get_and_clear_fail(&mut self) -> bool {
        let fail = self.failflag;
        self.failflag = false;
        if fail {
            self.fail_count += 1;
        }
        fail
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn fail_count(&self) -> u64 {
        self.fail_count
    }

    /// The program counter as the trace driver wants it: `None` until known.
    pub fn pc(&self) -> Option<u16> {
        self.regs.pc
    }

    pub(crate) fn word_at(hi: Option<u8>, lo: Option<u8>) -> Option<u16> {
        zip_map(hi.map(|h| h as u16), lo.map(|l| l as u16), |h, l| h << 8 | l)
    }

    pub(crate) fn fail(&mut self, what: &str) {
        log::debug!("prediction failed: {}", what);
        self.failflag = true;
    }
}
