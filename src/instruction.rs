// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded instruction record and byte-stream decoding.

use crate::CpuType;
use crate::addressing_modes::decode_postbyte;
use crate::isa::{AddressingMode, OpcodeInfo};
use crate::utils::word;

/// One decoded instruction.
///
/// `bytes` holds the raw byte stream as fetched from the bus;
/// `length` is how many of them belong to the instruction.
/// [Prefix] Opcode [ExtraImm] [Postbyte] Op1 Op2
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the first byte, `None` when address lines were not captured.
    pub pc: Option<u16>,
    pub bytes: [u8; 8],
    /// 0 when the opcode is single-byte, `0x10` or `0x11` otherwise.
    pub prefix: u8,
    pub opcode: u8,
    /// Meaningful for post-byte modes only, 0 otherwise.
    pub postbyte: u8,
    /// Byte count, 1..=8.
    pub length: u8,
}

impl Instruction {
    /// Decodes an instruction from the head of a byte stream.
    ///
    /// Returns the instruction and its opcode record. Missing trailing bytes
    /// (truncated capture) read as zero; the caller bounds-checks against
    /// the sample window before committing to the decode.
    pub fn decode(stream: &[u8], pc: Option<u16>, cpu: CpuType) -> (Self, OpcodeInfo) {
        let at = |i: usize| stream.get(i).copied().unwrap_or(0);

        let b0 = at(0);
        let (prefix, opcode, mut len) = if b0 == 0x10 || b0 == 0x11 {
            (b0, at(1), 2)
        } else {
            (0, b0, 1)
        };

        let info = OpcodeInfo::lookup(prefix, opcode, cpu);

        if info.mode.has_extra_immediate() {
            len += 1;
        }
        let mut postbyte = 0;
        if info.mode.has_postbyte() {
            postbyte = at(len);
            len += 1;
        }
        len += info.mode.operand_bytes() as usize;
        if info.mode.base() == AddressingMode::Indexed {
            len += decode_postbyte(postbyte, cpu).extra_bytes as usize;
        }

        let mut bytes = [0; 8];
        for (i, byte) in bytes.iter_mut().enumerate().take(len.min(8)) {
            *byte = at(i);
        }

        let instruction = Self {
            pc,
            bytes,
            prefix,
            opcode,
            postbyte,
            length: len.min(8) as u8,
        };
        (instruction, info)
    }

    /// The prefix and opcode as one 16-bits value, `0x10xx`/`0x11xx` for the
    /// prefixed pages.
    pub fn opcode16(&self) -> u16 {
        (self.prefix as u16) << 8 | self.opcode as u16
    }

    /// Index of the first operand byte (past prefix, opcode, extra
    /// immediate and post-byte).
    pub fn operand_index(&self, info: &OpcodeInfo) -> usize {
        let mut index = if self.prefix != 0 { 2 } else { 1 };
        if info.mode.has_extra_immediate() {
            index += 1;
        }
        if info.mode.has_postbyte() {
            index += 1;
        }
        index
    }

    /// The extra immediate byte of the 6309 AIM/OIM/EIM/TIM forms.
    pub fn extra_immediate(&self) -> u8 {
        self.bytes[if self.prefix != 0 { 2 } else { 1 }]
    }

    /// 8-bits operand at the operand index.
    pub fn operand8(&self, info: &OpcodeInfo) -> u8 {
        self.bytes[self.operand_index(info)]
    }

    /// Big-endian 16-bits operand at the operand index.
    pub fn operand16(&self, info: &OpcodeInfo) -> u16 {
        let i = self.operand_index(info);
        word(self.bytes[i], self.bytes[i + 1])
    }

    /// Big-endian 32-bits operand at the operand index.
    pub fn operand32(&self, info: &OpcodeInfo) -> u32 {
        let i = self.operand_index(info);
        (word(self.bytes[i], self.bytes[i + 1]) as u32) << 16
            | word(self.bytes[i + 2], self.bytes[i + 3]) as u32
    }
}
