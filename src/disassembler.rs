// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disassembler module.

use crate::CpuType;
use crate::addressing_modes::{IndexedEntry, IndexedKind, decode_postbyte};
use crate::instruction::Instruction;
use crate::isa::{AddressingMode, OpcodeInfo};
use crate::utils::sext8;

/// Inter-register names, indexed by TFR/EXG post-byte nibble.
const REGI4_6809: [&str; 16] = [
    "D", "X", "Y", "U", "S", "PC", "??", "??", "A", "B", "CC", "DP", "??", "??", "??", "??",
];

const REGI4_6309: [&str; 16] = [
    "D", "X", "Y", "U", "S", "PC", "W", "TV", "A", "B", "CC", "DP", "0", "0", "E", "F",
];

/// PSHS/PULS post-byte bits, MSB first.
const PSHS_REGS: [&str; 8] = ["PC", "U", "Y", "X", "DP", "B", "A", "CC"];

/// PSHU/PULU replace U with S.
const PSHU_REGS: [&str; 8] = ["PC", "S", "Y", "X", "DP", "B", "A", "CC"];

/// TFM source/destination register names.
const TFM_REGS: [char; 16] = [
    'D', 'X', 'Y', 'U', 'S', '?', '?', '?', '?', '?', '?', '?', '?', '?', '?', '?',
];

/// TFM increment decoration per opcode low bits, source then destination.
const TFM_R0_INC: [char; 4] = ['+', '-', '+', ' '];
const TFM_R1_INC: [char; 4] = ['+', '-', ' ', '+'];

/// Renders one decoded instruction as `MNEMONIC operand` with six-column
/// mnemonic padding.
pub fn disassemble(inst: &Instruction, info: &OpcodeInfo, cpu: CpuType) -> String {
    let mut line = format!("{:<6}", info.mnemonic.to_string());

    let mut mode = info.mode;
    // The 6309 bit-manipulation immediate leads the operand, then the
    // instruction renders as its base mode.
    if mode.has_extra_immediate() {
        line.push_str(&format!("#${:02X} ", inst.extra_immediate()));
        mode = mode.base();
    }
    line.push_str(&operand(inst, info, mode, cpu));

    line.trim_end().to_string()
}

fn operand(inst: &Instruction, info: &OpcodeInfo, mode: AddressingMode, cpu: CpuType) -> String {
    match mode {
        AddressingMode::Inherent => String::new(),
        AddressingMode::Register => register_operand(inst, cpu),
        AddressingMode::Immediate8 => format!("#${:02X}", inst.operand8(info)),
        AddressingMode::Immediate16 => format!("#${:04X}", inst.operand16(info)),
        AddressingMode::Immediate32 => format!("#${:08X}", inst.operand32(info)),
        AddressingMode::Direct => format!("${:02X}", inst.operand8(info)),
        AddressingMode::Extended => format!("${:04X}", inst.operand16(info)),
        AddressingMode::Relative8 | AddressingMode::Relative16 => {
            let offset = if mode == AddressingMode::Relative8 {
                sext8(inst.operand8(info)) as i16
            } else {
                inst.operand16(info) as i16
            };
            match inst.pc {
                Some(pc) => {
                    let target = pc.wrapping_add(inst.length as u16).wrapping_add(offset as u16);
                    format!("${:04X}", target)
                }
                None if offset < 0 => format!("pc-{}", -(offset as i32)),
                None => format!("pc+{}", offset),
            }
        }
        AddressingMode::DirectBit => {
            let reg = match inst.postbyte >> 6 & 3 {
                0 => "CC",
                1 => "A",
                2 => "B",
                _ => "?",
            };
            format!(
                "{},{},{},${:02X}",
                reg,
                inst.postbyte >> 3 & 7,
                inst.postbyte & 7,
                inst.operand8(info)
            )
        }
        AddressingMode::Indexed => indexed_operand(inst, info, cpu),
        // base() never returns the *Immediate layers.
        _ => String::new(),
    }
}

fn register_operand(inst: &Instruction, cpu: CpuType) -> String {
    let pb = inst.postbyte;
    let regi4: &[&str; 16] = if cpu.is_6309() { &REGI4_6309 } else { &REGI4_6809 };

    match inst.opcode16() {
        // ORCC/ANDCC carry their immediate in the post-byte slot.
        0x001A | 0x001C => format!("#${:02X}", pb),
        // EXG/TFR and the 6309 inter-register ALU group.
        0x001E | 0x001F | 0x1030..=0x1037 => {
            format!("{},{}", regi4[(pb >> 4 & 0x0F) as usize], regi4[(pb & 0x0F) as usize])
        }
        0x0034 | 0x0036 => push_list(pb, inst.opcode16() == 0x0034, false),
        0x0035 | 0x0037 => push_list(pb, inst.opcode16() == 0x0035, true),
        // TFM r0+,r1+ / r0-,r1- / r0+,r1 / r0,r1+
        0x1138..=0x113B => {
            let form = (inst.opcode & 3) as usize;
            format!(
                "{}{},{}{}",
                TFM_REGS[(pb >> 4 & 0x0F) as usize],
                TFM_R0_INC[form],
                TFM_REGS[(pb & 0x0F) as usize],
                TFM_R1_INC[form],
            )
            .replace(' ', "")
        }
        _ => String::new(),
    }
}

/// PSHS/PSHU render the post-byte MSB first; PULS/PULU mirror it so the
/// list reads in pull order.
fn push_list(pb: u8, hardware_stack: bool, reverse: bool) -> String {
    let names: &[&str; 8] = if hardware_stack { &PSHS_REGS } else { &PSHU_REGS };
    let mut regs: Vec<&str> = (0..8).filter(|i| pb & 0x80 >> i != 0).map(|i| names[i as usize]).collect();
    if reverse {
        regs.reverse();
    }
    regs.join(",")
}

fn indexed_operand(inst: &Instruction, info: &OpcodeInfo, cpu: CpuType) -> String {
    let entry = decode_postbyte(inst.postbyte, cpu);
    if !entry.is_legal(cpu) {
        return String::from("?");
    }

    let body = indexed_body(inst, info, &entry);
    if entry.indirect {
        format!("[{}]", body)
    } else {
        body
    }
}

fn indexed_body(inst: &Instruction, info: &OpcodeInfo, entry: &IndexedEntry) -> String {
    let reg = entry.reg.name();
    let op8 = || inst.operand8(info);
    let op16 = || inst.operand16(info);

    match entry.kind {
        IndexedKind::Offset5(offset) if offset < 0 => format!("-${:02X},{}", -(offset as i16), reg),
        IndexedKind::Offset5(offset) => format!("${:02X},{}", offset, reg),
        IndexedKind::PostInc1 => format!(",{}+", reg),
        IndexedKind::PostInc2 => format!(",{}++", reg),
        IndexedKind::PreDec1 => format!(",-{}", reg),
        IndexedKind::PreDec2 => format!(",--{}", reg),
        IndexedKind::ZeroOffset => format!(",{}", reg),
        IndexedKind::AccA => format!("A,{}", reg),
        IndexedKind::AccB => format!("B,{}", reg),
        IndexedKind::AccD => format!("D,{}", reg),
        IndexedKind::AccE => format!("E,{}", reg),
        IndexedKind::AccF => format!("F,{}", reg),
        IndexedKind::AccW => format!("W,{}", reg),
        IndexedKind::Offset8 => format!("${:02X},{}", op8(), reg),
        IndexedKind::Offset16 => format!("${:04X},{}", op16(), reg),
        IndexedKind::PcOffset8 => format!("${:02X},PCR", op8()),
        IndexedKind::PcOffset16 => format!("${:04X},PCR", op16()),
        IndexedKind::ExtendedIndirect => format!("${:04X}", op16()),
        IndexedKind::WZero => String::from(",W"),
        IndexedKind::WOffset16 => format!("${:04X},W", op16()),
        IndexedKind::WPostInc2 => String::from(",W++"),
        IndexedKind::WPreDec2 => String::from(",--W"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dis(bytes: &[u8], pc: Option<u16>, cpu: CpuType) -> String {
        let (inst, info) = Instruction::decode(bytes, pc, cpu);
        disassemble(&inst, &info, cpu)
    }

    #[test]
    fn immediate_and_register_modes() {
        assert_eq!(dis(&[0x86, 0x42], None, CpuType::Cpu6809), "LDA   #$42");
        assert_eq!(dis(&[0x10, 0x8E, 0x12, 0x34], None, CpuType::Cpu6809), "LDY   #$1234");
        assert_eq!(dis(&[0x34, 0x06], None, CpuType::Cpu6809), "PSHS  B,A");
        assert_eq!(dis(&[0x35, 0x06], None, CpuType::Cpu6809), "PULS  A,B");
        assert_eq!(dis(&[0x1F, 0x8B], None, CpuType::Cpu6809), "TFR   A,DP");
        assert_eq!(dis(&[0x1A, 0x50], None, CpuType::Cpu6809), "ORCC  #$50");
    }

    #[test]
    fn indexed_modes() {
        assert_eq!(dis(&[0xA6, 0x84], None, CpuType::Cpu6809), "LDA   ,X");
        assert_eq!(dis(&[0xA6, 0x82], None, CpuType::Cpu6809), "LDA   ,-X");
        assert_eq!(dis(&[0xA6, 0xD4], None, CpuType::Cpu6809), "LDA   [,U]");
        assert_eq!(dis(&[0xA6, 0x1E], None, CpuType::Cpu6809), "LDA   -$02,X");
        assert_eq!(dis(&[0xEC, 0x8D, 0x00, 0x04], None, CpuType::Cpu6809), "LDD   $0004,PCR");
        assert_eq!(dis(&[0xA6, 0x9F, 0x20, 0x00], None, CpuType::Cpu6809), "LDA   [$2000]");
    }

    #[test]
    fn relative_modes() {
        // BRA with a known PC resolves the target.
        assert_eq!(dis(&[0x20, 0x10], Some(0x1000), CpuType::Cpu6809), "BRA   $1012");
        assert_eq!(dis(&[0x20, 0xFE], Some(0x1000), CpuType::Cpu6809), "BRA   $1000");
        // Without a PC the offset is symbolic.
        assert_eq!(dis(&[0x20, 0xFE], None, CpuType::Cpu6809), "BRA   pc-2");
        assert_eq!(dis(&[0x16, 0x01, 0x00], Some(0x1000), CpuType::Cpu6809), "LBRA  $1103");
    }

    #[test]
    fn cpu6309_forms() {
        assert_eq!(
            dis(&[0x11, 0x8E, 0x00, 0x64], None, CpuType::Cpu6309),
            "DIVQ  #$0064"
        );
        assert_eq!(
            dis(&[0x62, 0xC0, 0x88, 0x80], None, CpuType::Cpu6309),
            "AIM   #$C0 $80,X"
        );
        assert_eq!(
            dis(&[0x11, 0x36, 0x47, 0x20], None, CpuType::Cpu6309),
            "LDBT  A,0,7,$20"
        );
        assert_eq!(dis(&[0x11, 0x38, 0x12], None, CpuType::Cpu6309), "TFM   X+,Y+");
        assert_eq!(dis(&[0xA6, 0x8F], None, CpuType::Cpu6309), "LDA   ,W");
        // W,R and friends are a 6309 affair.
        assert_eq!(dis(&[0xA6, 0x8E], None, CpuType::Cpu6809), "LDA   ?");
    }

    #[test]
    fn illegal_renders_questions() {
        assert_eq!(dis(&[0x10, 0x00], None, CpuType::Cpu6809), "???");
    }
}
