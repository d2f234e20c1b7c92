// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The trace driver: pulls samples, finds instruction boundaries,
//! dispatches to the emulator and the disassembler, emits output lines.

use crate::{CpuType, M6809};
use crate::cpu_details::{CycleCount, CycleError, count_cycles};
use crate::disassembler::disassemble;
use crate::exception::{match_interrupt, match_reset};
use crate::instruction::Instruction;
use crate::isa::OpcodeInfo;
use crate::memory_access::MemoryAccess;
use crate::queue::{DEPTH, SampleQueue};
use crate::sample::{Sample, SampleSource};
use crate::utils::hex4;

use log::{debug, warn};

/// Driver configuration: CPU variant, output field toggles and the trigger
/// window.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub cpu: CpuType,
    pub show_samplenums: bool,
    pub show_cycles: bool,
    pub show_address: bool,
    pub show_hex: bool,
    pub show_state: bool,
    /// Arm output when this PC is reached.
    pub trigger_start: Option<u16>,
    /// Disarm output when this PC is reached.
    pub trigger_stop: Option<u16>,
    /// Emulate interrupt entries silently.
    pub trigger_skipint: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu: CpuType::Cpu6809,
            show_samplenums: false,
            show_cycles: false,
            show_address: true,
            show_hex: true,
            show_state: true,
            trigger_start: None,
            trigger_stop: None,
            trigger_skipint: false,
        }
    }
}

/// End-of-trace statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub instructions: u64,
    pub fails: u64,
    /// Boundaries decided by LIC versus predicted from the tables.
    pub lic_boundaries: u64,
    pub computed_boundaries: u64,
    /// The capture ended inside an instruction.
    pub truncated: bool,
}

/// Owns the emulator core, the sample queue and the memory model for the
/// lifetime of one trace.
pub struct Driver<M> {
    config: Config,
    cpu: M6809,
    memory: M,
    queue: SampleQueue,
    triggered: bool,
    summary: Summary,
    /// Set when an unpredictable boundary forces a re-sync to the next LIC
    /// edge.
    resync: bool,
}

impl<M: MemoryAccess> Driver<M> {
    pub fn new(config: Config, memory: M) -> Self {
        Self {
            config,
            cpu: M6809::new(config.cpu),
            memory,
            queue: SampleQueue::new(),
            triggered: config.trigger_start.is_none(),
            summary: Summary::default(),
            resync: false,
        }
    }

    /// Access to the emulator core, mainly for tests and for seeding state.
    pub fn cpu_mut(&mut self) -> &mut M6809 {
        &mut self.cpu
    }

    /// The memory model reconstructed so far.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Runs the trace to end of stream, feeding each output line to `sink`.
    pub fn run(
        &mut self,
        source: &mut impl SampleSource,
        sink: &mut impl FnMut(&str),
    ) -> Summary {
        loop {
            self.queue.fill(source);
            if self.queue.is_empty() {
                break;
            }

            if self.resync {
                self.resync_to_lic(source);
                continue;
            }

            let window: Vec<Sample> = self.queue.head(DEPTH).to_vec();

            // The interrupt pattern is tested first: a FIRQ entry's vector
            // fetch would otherwise satisfy the reset matcher.
            if let Some(matched) = match_interrupt(&window) {
                self.cpu.interrupt(&window, &matched, &mut self.memory);
                self.cpu.get_and_clear_fail();
                if self.triggered && !self.config.trigger_skipint {
                    let line = self.event_line(&window, matched.cycles, matched.kind.name());
                    sink(&line);
                }
                self.queue.pop(matched.cycles);
                continue;
            }

            if let Some(matched) = match_reset(&window) {
                self.cpu.reset(&matched);
                if self.triggered {
                    let line = self.event_line(&window, matched.cycles, "RESET");
                    sink(&line);
                }
                self.queue.pop(matched.cycles);
                continue;
            }

            let count = match count_cycles(&window, self.queue.at_end(), self.config.cpu, &self.cpu.regs) {
                Ok(count) => count,
                Err(CycleError::Truncated { needed, available }) => {
                    warn!("truncated trace: needed {} cycles, {} captured", needed, available);
                    if self.triggered {
                        let line = self.event_line(&window, available, "??? truncated");
                        sink(&line);
                    }
                    self.summary.truncated = true;
                    break;
                }
                Err(CycleError::Unpredictable { base }) => {
                    if window.iter().any(|s| s.lic.is_some()) {
                        debug!("unpredictable boundary, assuming {} cycles and re-syncing on LIC", base);
                        // No re-sync needed if the assumed count happens to
                        // land on a LIC edge.
                        self.resync = window.get(base.saturating_sub(1))
                            .is_none_or(|s| s.lic != Some(true));
                        CycleCount::Computed(base)
                    } else {
                        warn!("unpredictable boundary and no LIC to re-sync on");
                        if self.triggered {
                            let line = self.event_line(&window, base, "??? unpredictable");
                            sink(&line);
                        }
                        self.summary.truncated = true;
                        break;
                    }
                }
            };

            match count {
                CycleCount::Lic(_) => self.summary.lic_boundaries += 1,
                CycleCount::Computed(_) => self.summary.computed_boundaries += 1,
            }
            let cycles = count.cycles().min(window.len());

            let stream: Vec<u8> = window.iter().map(|s| s.data).collect();
            let (inst, info) = Instruction::decode(&stream, self.cpu.pc(), self.config.cpu);

            self.arm_triggers(inst.pc);

            self.cpu.emulate(&window[..cycles], &inst, &info, &mut self.memory);
            let fail = self.cpu.get_and_clear_fail();
            if fail {
                self.summary.fails += 1;
            }

            if self.triggered {
                let line = self.instruction_line(&window, count.cycles(), &inst, &info, fail);
                sink(&line);
            }

            self.pop_cycles(source, count.cycles());
        }

        self.summary.instructions = self.cpu.instruction_count();
        self.summary
    }

    /// Pops `cycles` samples, refilling as needed when an instruction (a
    /// TFM sweep) outruns the window.
    fn pop_cycles(&mut self, source: &mut impl SampleSource, cycles: usize) {
        let mut remaining = cycles;
        loop {
            let take = remaining.min(self.queue.len());
            self.queue.pop(take);
            remaining -= take;
            if remaining == 0 {
                return;
            }
            self.queue.fill(source);
            if self.queue.is_empty() {
                return;
            }
        }
    }

    /// Drops samples until the window starts just past a LIC-high cycle.
    fn resync_to_lic(&mut self, source: &mut impl SampleSource) {
        while !self.queue.is_empty() {
            let sample = self.queue.head(1)[0];
            self.queue.pop(1);
            if sample.lic == Some(true) {
                self.resync = false;
                return;
            }
            if self.queue.is_empty() {
                self.queue.fill(source);
                if self.queue.is_empty() {
                    self.resync = false;
                    return;
                }
            }
        }
        self.resync = false;
    }

    fn arm_triggers(&mut self, pc: Option<u16>) {
        let Some(pc) = pc else { return };
        if self.config.trigger_start == Some(pc) {
            self.triggered = true;
        }
        if self.config.trigger_stop == Some(pc) {
            self.triggered = false;
        }
    }

    /// `[samplenum] [cycles] [address] [hex] mnemonic operand [state] [fail]`
    fn instruction_line(
        &self,
        window: &[Sample],
        cycles: usize,
        inst: &Instruction,
        info: &OpcodeInfo,
        fail: bool,
    ) -> String {
        let mut line = self.line_head(window, cycles, inst.pc);

        if self.config.show_hex {
            let mut hex = String::new();
            for i in 0..inst.length as usize {
                hex.push_str(&format!("{:02X} ", inst.bytes[i]));
            }
            line.push_str(&format!("{:<24} ", hex.trim_end()));
        }

        line.push_str(&disassemble(inst, info, self.config.cpu));

        if self.config.show_state {
            line.push_str(&format!(" : {}", self.cpu.regs.render(self.config.cpu)));
        }
        if fail {
            line.push_str(" FAIL");
        }
        line
    }

    /// Output line for reset/interrupt entries and trace-level failures.
    fn event_line(&self, window: &[Sample], cycles: usize, label: &str) -> String {
        let mut line = self.line_head(window, cycles, self.cpu.pc());
        if self.config.show_hex {
            line.push_str(&format!("{:<24} ", ""));
        }
        line.push_str(label);
        if self.config.show_state {
            line.push_str(&format!(" : {}", self.cpu.regs.render(self.config.cpu)));
        }
        line
    }

    fn line_head(&self, window: &[Sample], cycles: usize, pc: Option<u16>) -> String {
        let mut line = String::new();
        if self.config.show_samplenums {
            line.push_str(&format!("{:8} ", window.first().map_or(0, |s| s.seq)));
        }
        if self.config.show_cycles {
            line.push_str(&format!("{:2} ", cycles));
        }
        if self.config.show_address {
            line.push_str(&format!("{} ", hex4(pc)));
        }
        line
    }
}
