// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instruction cycle counting and the instruction boundary finder.

use crate::{CpuType, Registers};
use crate::addressing_modes::decode_postbyte;
use crate::instruction::Instruction;
use crate::isa::{AddressingMode, Mnemonic};
use crate::sample::Sample;
use crate::utils::bit;

use thiserror::Error;

/// How the boundary of the next instruction was determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleCount {
    /// Exact: the index of the first LIC-high sample marked the boundary.
    Lic(usize),
    /// Predicted from the opcode tables and the operand bytes.
    Computed(usize),
}

impl CycleCount {
    pub fn cycles(self) -> usize {
        match self {
            Self::Lic(n) | Self::Computed(n) => n,
        }
    }
}

/// Boundary finder failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CycleError {
    /// End of stream before the instruction completed.
    #[error("truncated trace: instruction needs {needed} cycles, {available} captured")]
    Truncated { needed: usize, available: usize },
    /// LIC absent and a flag or operand needed to predict the cycle count is
    /// unknown. `base` is the count to degrade to.
    #[error("cycle count cannot be predicted, assuming {base}")]
    Unpredictable { base: usize },
}

/// Number of bytes moved by a PSHS/PULS/PSHU/PULU post-byte list.
///
/// Each moved byte costs one cycle on top of the base count.
pub fn push_list_bytes(postbyte: u8) -> usize {
    let mut bytes = 0;
    for (i, width) in [2, 2, 2, 2, 1, 1, 1, 1].into_iter().enumerate() {
        if bit(postbyte, 7 - i as u8) {
            bytes += width;
        }
    }
    bytes
}

/// Extra cycles of a 6309 division relative to the base count.
///
/// A zero divisor aborts the divide early, a quotient that overflows its
/// destination exits once the magnitude test fails. `None` when the divisor
/// is unknown.
fn division_extra(mnemonic: Mnemonic, divisor: Option<u16>, dividend: Option<i32>) -> Option<isize> {
    let (zero_delta, overflow_delta, byte_divisor) = match mnemonic {
        Mnemonic::Divd => (-19, -13, true),
        Mnemonic::Divq => (-28, -21, false),
        _ => return Some(0),
    };
    let divisor = if byte_divisor {
        divisor? as u8 as i8 as i32
    } else {
        divisor? as i16 as i32
    };
    if divisor == 0 {
        return Some(zero_delta);
    }
    let Some(dividend) = dividend else {
        // Without the dividend the overflow exit cannot be predicted;
        // assume the full count and let LIC re-sync correct it.
        return Some(0);
    };
    let quotient = dividend / divisor;
    let fits = if byte_divisor {
        quotient >= i8::MIN as i32 && quotient <= i8::MAX as i32
    } else {
        quotient >= i16::MIN as i32 && quotient <= i16::MAX as i32
    };
    Some(if fits { 0 } else { overflow_delta })
}

/// Determines how many samples at the head of `window` form the next
/// instruction.
///
/// When every sample carries a valid LIC bit the boundary is exact: the
/// count is the index of the first LIC-high sample plus one. Otherwise the
/// count is computed from the opcode bytes, working forward from the start
/// of the instruction (base cycles, indexed post-byte extras, push/pull
/// lists, taken long branches, division operands).
pub fn count_cycles(
    window: &[Sample],
    at_end: bool,
    cpu: CpuType,
    regs: &Registers,
) -> Result<CycleCount, CycleError> {
    if window.is_empty() {
        return Err(CycleError::Truncated { needed: 1, available: 0 });
    }

    if window.iter().all(|s| s.lic.is_some()) {
        if let Some(index) = window.iter().position(|s| s.lic == Some(true)) {
            return Ok(CycleCount::Lic(index + 1));
        }
        // No LIC edge in a full window: the instruction outruns the window
        // (a TFM sweep). Fall through to the computed count.
        if at_end {
            return Err(CycleError::Truncated { needed: window.len() + 1, available: window.len() });
        }
    }

    let stream: Vec<u8> = window.iter().map(|s| s.data).collect();
    let (inst, info) = Instruction::decode(&stream, None, cpu);

    if (inst.length as usize) > window.len() {
        return Err(CycleError::Truncated {
            needed: inst.length as usize,
            available: window.len(),
        });
    }

    let mut cycles = info.base_cycles as usize;

    if info.mode.base() == AddressingMode::Indexed {
        cycles += decode_postbyte(inst.postbyte, cpu).extra_cycles as usize;
    }

    match info.mnemonic {
        Mnemonic::Pshs | Mnemonic::Puls | Mnemonic::Pshu | Mnemonic::Pulu => {
            cycles += push_list_bytes(inst.postbyte);
        }
        // Taken long conditional branches cost one more cycle.
        Mnemonic::Lbrn | Mnemonic::Lbhi | Mnemonic::Lbls | Mnemonic::Lbcc | Mnemonic::Lbcs
        | Mnemonic::Lbne | Mnemonic::Lbeq | Mnemonic::Lbvc | Mnemonic::Lbvs | Mnemonic::Lbpl
        | Mnemonic::Lbmi | Mnemonic::Lbge | Mnemonic::Lblt | Mnemonic::Lbgt | Mnemonic::Lble => {
            match regs.cc.condition(inst.opcode & 0x0F) {
                Some(true) => cycles += 1,
                Some(false) => {}
                None => return Err(CycleError::Unpredictable { base: cycles }),
            }
        }
        // RTI pulls the entire state when the stacked E flag is set. The
        // stacked CC is the first pull, two cycles into the window.
        Mnemonic::Rti => {
            let cc = window.get(2).map(|s| s.data).ok_or(CycleError::Truncated {
                needed: 3,
                available: window.len(),
            })?;
            if bit(cc, 7) {
                cycles += 9;
            }
        }
        // TFM moves one byte every three cycles, W times.
        Mnemonic::Tfm => match regs.w() {
            Some(w) => cycles += 3 * w as usize,
            None => return Err(CycleError::Unpredictable { base: cycles }),
        },
        Mnemonic::Divd | Mnemonic::Divq => {
            let divisor = match info.mode {
                AddressingMode::Immediate8 => Some(inst.operand8(&info) as u16),
                AddressingMode::Immediate16 => Some(inst.operand16(&info)),
                // A memory divisor sits at an operand-dependent position;
                // its value cannot be read off the window up front.
                _ => None,
            };
            let dividend = match info.mnemonic {
                Mnemonic::Divd => regs.d().map(|d| d as i16 as i32),
                _ => regs.q().map(|q| q as i32),
            };
            match division_extra(info.mnemonic, divisor, dividend) {
                Some(delta) => cycles = cycles.saturating_add_signed(delta),
                None => return Err(CycleError::Unpredictable { base: cycles }),
            }
        }
        _ => {}
    }

    if cycles > window.len() && at_end {
        return Err(CycleError::Truncated { needed: cycles, available: window.len() });
    }

    Ok(CycleCount::Computed(cycles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleKind;

    fn window_from(bytes: &[u8], lic_period: Option<usize>) -> Vec<Sample> {
        (0..bytes.len())
            .map(|i| Sample {
                kind: SampleKind::Normal,
                seq: i as u32,
                data: bytes[i],
                lic: lic_period.map(|p| i + 1 == p),
                ..Sample::default()
            })
            .collect()
    }

    #[test]
    fn lic_mode_is_exact() {
        let window = window_from(&[0x12, 0x00, 0x00, 0x00], Some(2));
        let count = count_cycles(&window, false, CpuType::Cpu6809, &Registers::UNKNOWN).unwrap();
        assert_eq!(count, CycleCount::Lic(2));
    }

    #[test]
    fn computed_immediate_load() {
        // LDA #$42 is two cycles.
        let window = window_from(&[0x86, 0x42, 0x00, 0x00], None);
        let count = count_cycles(&window, false, CpuType::Cpu6809, &Registers::UNKNOWN).unwrap();
        assert_eq!(count, CycleCount::Computed(2));
    }

    #[test]
    fn computed_indexed_extras() {
        // LDA n15,PCR: 4 base + 5 post-byte extras.
        let window = window_from(&[0xA6, 0x8D, 0x00, 0x04, 0, 0, 0, 0, 0, 0], None);
        let count = count_cycles(&window, false, CpuType::Cpu6809, &Registers::UNKNOWN).unwrap();
        assert_eq!(count, CycleCount::Computed(9));
    }

    #[test]
    fn push_list_cycles() {
        // PSHS B,A: 5 base + 2 bytes pushed.
        let window = window_from(&[0x34, 0x06, 0, 0, 0, 0, 0, 0], None);
        let count = count_cycles(&window, false, CpuType::Cpu6809, &Registers::UNKNOWN).unwrap();
        assert_eq!(count, CycleCount::Computed(7));
        assert_eq!(push_list_bytes(0xFF), 12);
        assert_eq!(push_list_bytes(0x06), 2);
    }

    #[test]
    fn long_branch_needs_flags() {
        let window = window_from(&[0x10, 0x27, 0x00, 0x10, 0, 0, 0], None);
        let err = count_cycles(&window, false, CpuType::Cpu6809, &Registers::UNKNOWN).unwrap_err();
        assert_eq!(err, CycleError::Unpredictable { base: 5 });

        let mut regs = Registers::UNKNOWN;
        regs.cc.z = Some(true);
        let count = count_cycles(&window, false, CpuType::Cpu6809, &regs).unwrap();
        assert_eq!(count, CycleCount::Computed(6));

        regs.cc.z = Some(false);
        let count = count_cycles(&window, false, CpuType::Cpu6809, &regs).unwrap();
        assert_eq!(count, CycleCount::Computed(5));
    }

    #[test]
    fn truncated_window() {
        let window = window_from(&[0x86], None);
        let err = count_cycles(&window, true, CpuType::Cpu6809, &Registers::UNKNOWN).unwrap_err();
        assert_eq!(err, CycleError::Truncated { needed: 2, available: 1 });
    }
}
