//! Disassembly round-trip checks: every table entry renders with the
//! documented assembler syntax for a canonical operand.

use m6809::CpuType;
use m6809::disassembler::disassemble;
use m6809::instruction::Instruction;
use m6809::isa::{AddressingMode, Mnemonic, OpcodeInfo};

/// Builds the canonical encoding of `(prefix, opcode)` with a fixed
/// operand pattern.
fn encode(prefix: u8, opcode: u8, info: &OpcodeInfo) -> Vec<u8> {
    let mut bytes = Vec::new();
    if prefix != 0 {
        bytes.push(prefix);
    }
    bytes.push(opcode);
    if info.mode.has_extra_immediate() {
        bytes.push(0x55);
    }
    if info.mode.has_postbyte() {
        bytes.push(match info.mode.base() {
            // ,X: defined on every CPU, no extension bytes.
            AddressingMode::Indexed => 0x84,
            // A,1,2,$xx for the bit group; a plain pair for the rest.
            AddressingMode::DirectBit => 0x4A,
            _ => match info.mnemonic {
                Mnemonic::Pshs | Mnemonic::Puls | Mnemonic::Pshu | Mnemonic::Pulu => 0x06,
                Mnemonic::Tfm => 0x12,
                _ => 0x12,
            },
        });
    }
    for i in 0..info.mode.operand_bytes() {
        bytes.push(0x20 + i * 0x20);
    }
    bytes
}

#[test]
fn every_opcode_disassembles() {
    for cpu in [CpuType::Cpu6809, CpuType::Cpu6309] {
        for prefix in [0x00u8, 0x10, 0x11] {
            for opcode in 0..=255u8 {
                let info = OpcodeInfo::lookup(prefix, opcode, cpu);
                if info == OpcodeInfo::ILLEGAL {
                    continue;
                }

                let bytes = encode(prefix, opcode, &info);
                let (inst, decoded) = Instruction::decode(&bytes, Some(0x1000), cpu);
                assert_eq!(
                    decoded, info,
                    "decode of {:02X} {:02X} on {:?}",
                    prefix, opcode, cpu
                );
                assert_eq!(
                    inst.length as usize,
                    bytes.len(),
                    "length of {:02X} {:02X} on {:?}",
                    prefix, opcode, cpu
                );

                let line = disassemble(&inst, &info, cpu);
                let mut tokens = line.split_whitespace();
                assert_eq!(
                    tokens.next(),
                    Some(info.mnemonic.to_string().as_str()),
                    "mnemonic token of {:02X} {:02X}: {:?}",
                    prefix, opcode, line
                );

                let operand = tokens.next();
                match info.mode {
                    AddressingMode::Inherent => {
                        assert_eq!(operand, None, "inherent operand: {:?}", line)
                    }
                    AddressingMode::Immediate8 | AddressingMode::Immediate16
                    | AddressingMode::Immediate32 => {
                        assert!(operand.unwrap().starts_with("#$"), "immediate: {:?}", line)
                    }
                    AddressingMode::Direct | AddressingMode::Extended => {
                        assert!(operand.unwrap().starts_with('$'), "absolute: {:?}", line)
                    }
                    AddressingMode::Relative8 | AddressingMode::Relative16 => {
                        assert!(operand.unwrap().starts_with('$'), "relative: {:?}", line)
                    }
                    AddressingMode::Indexed => {
                        assert_eq!(operand, Some(",X"), "indexed: {:?}", line)
                    }
                    AddressingMode::DirectBit => {
                        assert!(operand.unwrap().contains(','), "direct bit: {:?}", line)
                    }
                    AddressingMode::Register => {
                        assert!(operand.is_some(), "register list: {:?}", line)
                    }
                    // The *Immediate forms lead with the extra immediate.
                    _ => {
                        assert_eq!(operand, Some("#$55"), "extra immediate: {:?}", line)
                    }
                }
            }
        }
    }
}

/// The documented rendering of a representative instruction set, byte
/// patterns from the data sheets.
#[test]
fn documented_syntax() {
    let cases: &[(&[u8], CpuType, &str)] = &[
        (&[0x86, 0x42], CpuType::Cpu6809, "LDA   #$42"),
        (&[0x10, 0x8E, 0x12, 0x34], CpuType::Cpu6809, "LDY   #$1234"),
        (&[0xA6, 0x84], CpuType::Cpu6809, "LDA   ,X"),
        (&[0xEC, 0x8D, 0x00, 0x04], CpuType::Cpu6809, "LDD   $0004,PCR"),
        (&[0x34, 0x06], CpuType::Cpu6809, "PSHS  B,A"),
        (&[0xCD, 0x00, 0x10, 0x20, 0x30], CpuType::Cpu6309, "LDQ   #$00102030"),
        (&[0x96, 0x80], CpuType::Cpu6809, "LDA   $80"),
        (&[0xB7, 0x20, 0x00], CpuType::Cpu6809, "STA   $2000"),
        (&[0x6F, 0x5C], CpuType::Cpu6809, "CLR   -$04,U"),
        (&[0xA6, 0x91], CpuType::Cpu6809, "LDA   [,X++]"),
        (&[0x1E, 0x89], CpuType::Cpu6809, "EXG   A,B"),
        (&[0x35, 0x82], CpuType::Cpu6809, "PULS  A,PC"),
        (&[0x10, 0x3F], CpuType::Cpu6809, "SWI2"),
        (&[0x11, 0x83, 0x12, 0x34], CpuType::Cpu6809, "CMPU  #$1234"),
        (&[0x02, 0x55, 0x40], CpuType::Cpu6309, "AIM   #$55 $40"),
        (&[0x10, 0x30, 0x61], CpuType::Cpu6309, "ADDR  W,X"),
        (&[0x10, 0xDD, 0x40], CpuType::Cpu6309, "STQ   $40"),
    ];

    for &(bytes, cpu, expected) in cases {
        let (inst, info) = Instruction::decode(bytes, Some(0x1000), cpu);
        assert_eq!(disassemble(&inst, &info, cpu), expected, "bytes {:02X?}", bytes);
    }
}
