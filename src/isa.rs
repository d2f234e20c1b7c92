// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ISA definition: mnemonics, addressing modes and the opcode tables.

use crate::CpuType;

use std::fmt;

/// Addressing modes of the 6809/6309.
///
/// The three `*Immediate` modes are the 6309 bit-manipulation forms
/// (AIM/OIM/EIM/TIM) which carry an extra immediate byte between the opcode
/// and the normal operand; stripping that byte collapses them to their
/// [base](Self::base) mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    Inherent,
    Immediate8,
    Immediate16,
    Immediate32,
    Direct,
    DirectBit,
    Extended,
    Indexed,
    Relative8,
    Relative16,
    Register,
    DirectImmediate,
    ExtendedImmediate,
    IndexedImmediate,
}

impl AddressingMode {
    /// The mode once the 6309 extra immediate byte is stripped.
    pub const fn base(self) -> Self {
        match self {
            Self::DirectImmediate => Self::Direct,
            Self::ExtendedImmediate => Self::Extended,
            Self::IndexedImmediate => Self::Indexed,
            mode => mode,
        }
    }

    /// True for the 6309 bit-manipulation forms carrying an extra immediate.
    pub const fn has_extra_immediate(self) -> bool {
        matches!(self, Self::DirectImmediate | Self::ExtendedImmediate | Self::IndexedImmediate)
    }

    /// True when the instruction carries a post-byte after the opcode (and
    /// after the extra immediate for the `*Immediate` forms).
    pub const fn has_postbyte(self) -> bool {
        matches!(self.base(), Self::Indexed | Self::DirectBit | Self::Register)
    }

    /// Operand bytes following the post-byte. Indexed extension bytes are
    /// not included, they depend on the post-byte.
    pub const fn operand_bytes(self) -> u8 {
        match self.base() {
            Self::Inherent | Self::Register | Self::Indexed => 0,
            Self::Immediate8 | Self::Direct | Self::DirectBit | Self::Relative8 => 1,
            Self::Immediate16 | Self::Extended | Self::Relative16 => 2,
            Self::Immediate32 => 4,
            // base() never returns a *Immediate mode.
            _ => 0,
        }
    }
}

/// Every instruction of the 6809 and 6309, plus the synthetic
/// [Illegal](Self::Illegal).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mnemonic {
    Illegal,
    // 6809.
    Abx, Adca, Adcb, Adda, Addb, Addd, Anda, Andb, Andcc, Asl, Asla, Aslb,
    Asr, Asra, Asrb, Bcc, Bcs, Beq, Bge, Bgt, Bhi, Bita, Bitb, Ble, Bls,
    Blt, Bmi, Bne, Bpl, Bra, Brn, Bsr, Bvc, Bvs, Clr, Clra, Clrb, Cmpa,
    Cmpb, Cmpd, Cmps, Cmpu, Cmpx, Cmpy, Com, Coma, Comb, Cwai, Daa, Dec,
    Deca, Decb, Eora, Eorb, Exg, Inc, Inca, Incb, Jmp, Jsr, Lbcc, Lbcs,
    Lbeq, Lbge, Lbgt, Lbhi, Lble, Lbls, Lblt, Lbmi, Lbne, Lbpl, Lbra, Lbrn,
    Lbsr, Lbvc, Lbvs, Lda, Ldb, Ldd, Lds, Ldu, Ldx, Ldy, Leas, Leau, Leax,
    Leay, Lsr, Lsra, Lsrb, Mul, Neg, Nega, Negb, Nop, Ora, Orb, Orcc, Pshs,
    Pshu, Puls, Pulu, Rol, Rola, Rolb, Ror, Rora, Rorb, Rti, Rts, Sbca,
    Sbcb, Sex, Sta, Stb, Std, Sts, Stu, Stx, Sty, Suba, Subb, Subd, Swi,
    Swi2, Swi3, Sync, Tfr, Tst, Tsta, Tstb,
    // 6309 extensions.
    Adcd, Adcr, Adde, Addf, Addr, Addw, Aim, Andd, Andr, Asld, Asrd, Band,
    Beor, Biand, Bieor, Bior, Bitd, Bitmd, Bor, Clrd, Clre, Clrf, Clrw,
    Cmpe, Cmpf, Cmpr, Cmpw, Comd, Come, Comf, Comw, Decd, Dece, Decf, Decw,
    Divd, Divq, Eim, Eord, Eorr, Incd, Ince, Incf, Incw, Ldbt, Lde, Ldf,
    Ldmd, Ldq, Ldw, Lsrd, Lsrw, Muld, Negd, Oim, Ord, Orr, Pshsw, Pshuw,
    Pulsw, Puluw, Rold, Rolw, Rord, Rorw, Sbcd, Sbcr, Sexw, Stbt, Ste, Stf,
    Stq, Stw, Sube, Subf, Subr, Subw, Tfm, Tim, Tstd, Tste, Tstf, Tstw,
}

impl fmt::Display for Mnemonic {
    /// The assembler spelling of the mnemonic, `???` for
    /// [Illegal](Self::Illegal).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::Illegal {
            write!(f, "???")
        } else {
            write!(f, "{}", format!("{:?}", self).to_uppercase())
        }
    }
}

/// Static description of one `(prefix, opcode)` slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Base cycle count. Indexed extras, push/pull lists, taken long
    /// branches and division operands add to it (see
    /// [cpu_details](crate::cpu_details)).
    pub base_cycles: u8,
    pub undocumented: bool,
}

impl OpcodeInfo {
    /// The synthetic record returned for slots absent from the active
    /// tables. Mode `Inherent`, one cycle, so emulation advances without
    /// stalling.
    pub const ILLEGAL: Self = Self {
        mnemonic: Mnemonic::Illegal,
        mode: AddressingMode::Inherent,
        base_cycles: 1,
        undocumented: true,
    };

    const fn new(mnemonic: Mnemonic, mode: AddressingMode, base_cycles: u8) -> Self {
        Self { mnemonic, mode, base_cycles, undocumented: false }
    }

    const fn undoc(mnemonic: Mnemonic, mode: AddressingMode, base_cycles: u8) -> Self {
        Self { mnemonic, mode, base_cycles, undocumented: true }
    }

    /// Looks up `(prefix, opcode)` in the tables of the given CPU.
    ///
    /// `prefix` is 0 for single-byte opcodes, `0x10` or `0x11` otherwise.
    /// The 6309 tables overlay the 6809 ones when the CPU is a 6309;
    /// undocumented aliases the overlay does not reassign keep decoding as
    /// their documented twins.
    pub fn lookup(prefix: u8, opcode: u8, cpu: CpuType) -> Self {
        let entry = if cpu.is_6309() {
            Self::page_6309(prefix, opcode).or_else(|| Self::page_6809(prefix, opcode))
        } else {
            Self::page_6809(prefix, opcode)
        };
        entry.unwrap_or(Self::ILLEGAL)
    }

    fn page_6809(prefix: u8, opcode: u8) -> Option<Self> {
        match prefix {
            0x00 => Self::page0_6809(opcode),
            0x10 => Self::page2_6809(opcode),
            0x11 => Self::page3_6809(opcode),
            _ => None,
        }
    }

    fn page_6309(prefix: u8, opcode: u8) -> Option<Self> {
        match prefix {
            0x00 => Self::page0_6309(opcode),
            0x10 => Self::page2_6309(opcode),
            0x11 => Self::page3_6309(opcode),
            _ => None,
        }
    }

    fn page0_6809(opcode: u8) -> Option<Self> {
        use AddressingMode::*;
        use Mnemonic::*;

        Some(match opcode {
            0x00 => Self::new(Neg, Direct, 6),
            0x01 => Self::undoc(Neg, Direct, 6),
            0x03 => Self::new(Com, Direct, 6),
            0x04 => Self::new(Lsr, Direct, 6),
            0x05 => Self::undoc(Lsr, Direct, 6),
            0x06 => Self::new(Ror, Direct, 6),
            0x07 => Self::new(Asr, Direct, 6),
            0x08 => Self::new(Asl, Direct, 6),
            0x09 => Self::new(Rol, Direct, 6),
            0x0A => Self::new(Dec, Direct, 6),
            0x0B => Self::undoc(Dec, Direct, 6),
            0x0C => Self::new(Inc, Direct, 6),
            0x0D => Self::new(Tst, Direct, 6),
            0x0E => Self::new(Jmp, Direct, 3),
            0x0F => Self::new(Clr, Direct, 6),

            0x12 => Self::new(Nop, Inherent, 2),
            0x13 => Self::new(Sync, Inherent, 4),
            0x16 => Self::new(Lbra, Relative16, 5),
            0x17 => Self::new(Lbsr, Relative16, 9),
            0x19 => Self::new(Daa, Inherent, 2),
            0x1A => Self::new(Orcc, Register, 3),
            0x1C => Self::new(Andcc, Register, 3),
            0x1D => Self::new(Sex, Inherent, 2),
            0x1E => Self::new(Exg, Register, 8),
            0x1F => Self::new(Tfr, Register, 6),

            0x20 => Self::new(Bra, Relative8, 3),
            0x21 => Self::new(Brn, Relative8, 3),
            0x22 => Self::new(Bhi, Relative8, 3),
            0x23 => Self::new(Bls, Relative8, 3),
            0x24 => Self::new(Bcc, Relative8, 3),
            0x25 => Self::new(Bcs, Relative8, 3),
            0x26 => Self::new(Bne, Relative8, 3),
            0x27 => Self::new(Beq, Relative8, 3),
            0x28 => Self::new(Bvc, Relative8, 3),
            0x29 => Self::new(Bvs, Relative8, 3),
            0x2A => Self::new(Bpl, Relative8, 3),
            0x2B => Self::new(Bmi, Relative8, 3),
            0x2C => Self::new(Bge, Relative8, 3),
            0x2D => Self::new(Blt, Relative8, 3),
            0x2E => Self::new(Bgt, Relative8, 3),
            0x2F => Self::new(Ble, Relative8, 3),

            0x30 => Self::new(Leax, Indexed, 4),
            0x31 => Self::new(Leay, Indexed, 4),
            0x32 => Self::new(Leas, Indexed, 4),
            0x33 => Self::new(Leau, Indexed, 4),
            0x34 => Self::new(Pshs, Register, 5),
            0x35 => Self::new(Puls, Register, 5),
            0x36 => Self::new(Pshu, Register, 5),
            0x37 => Self::new(Pulu, Register, 5),
            0x39 => Self::new(Rts, Inherent, 5),
            0x3A => Self::new(Abx, Inherent, 3),
            0x3B => Self::new(Rti, Inherent, 6),
            0x3C => Self::new(Cwai, Immediate8, 20),
            0x3D => Self::new(Mul, Inherent, 11),
            0x3F => Self::new(Swi, Inherent, 19),

            0x40 => Self::new(Nega, Inherent, 2),
            0x41 => Self::undoc(Nega, Inherent, 2),
            0x43 => Self::new(Coma, Inherent, 2),
            0x44 => Self::new(Lsra, Inherent, 2),
            0x45 => Self::undoc(Lsra, Inherent, 2),
            0x46 => Self::new(Rora, Inherent, 2),
            0x47 => Self::new(Asra, Inherent, 2),
            0x48 => Self::new(Asla, Inherent, 2),
            0x49 => Self::new(Rola, Inherent, 2),
            0x4A => Self::new(Deca, Inherent, 2),
            0x4B => Self::undoc(Deca, Inherent, 2),
            0x4C => Self::new(Inca, Inherent, 2),
            0x4D => Self::new(Tsta, Inherent, 2),
            0x4F => Self::new(Clra, Inherent, 2),

            0x50 => Self::new(Negb, Inherent, 2),
            0x51 => Self::undoc(Negb, Inherent, 2),
            0x53 => Self::new(Comb, Inherent, 2),
            0x54 => Self::new(Lsrb, Inherent, 2),
            0x55 => Self::undoc(Lsrb, Inherent, 2),
            0x56 => Self::new(Rorb, Inherent, 2),
            0x57 => Self::new(Asrb, Inherent, 2),
            0x58 => Self::new(Aslb, Inherent, 2),
            0x59 => Self::new(Rolb, Inherent, 2),
            0x5A => Self::new(Decb, Inherent, 2),
            0x5B => Self::undoc(Decb, Inherent, 2),
            0x5C => Self::new(Incb, Inherent, 2),
            0x5D => Self::new(Tstb, Inherent, 2),
            0x5F => Self::new(Clrb, Inherent, 2),

            0x60 => Self::new(Neg, Indexed, 6),
            0x61 => Self::undoc(Neg, Indexed, 6),
            0x63 => Self::new(Com, Indexed, 6),
            0x64 => Self::new(Lsr, Indexed, 6),
            0x65 => Self::undoc(Lsr, Indexed, 6),
            0x66 => Self::new(Ror, Indexed, 6),
            0x67 => Self::new(Asr, Indexed, 6),
            0x68 => Self::new(Asl, Indexed, 6),
            0x69 => Self::new(Rol, Indexed, 6),
            0x6A => Self::new(Dec, Indexed, 6),
            0x6B => Self::undoc(Dec, Indexed, 6),
            0x6C => Self::new(Inc, Indexed, 6),
            0x6D => Self::new(Tst, Indexed, 6),
            0x6E => Self::new(Jmp, Indexed, 3),
            0x6F => Self::new(Clr, Indexed, 6),

            0x70 => Self::new(Neg, Extended, 7),
            0x71 => Self::undoc(Neg, Extended, 7),
            0x73 => Self::new(Com, Extended, 7),
            0x74 => Self::new(Lsr, Extended, 7),
            0x75 => Self::undoc(Lsr, Extended, 7),
            0x76 => Self::new(Ror, Extended, 7),
            0x77 => Self::new(Asr, Extended, 7),
            0x78 => Self::new(Asl, Extended, 7),
            0x79 => Self::new(Rol, Extended, 7),
            0x7A => Self::new(Dec, Extended, 7),
            0x7B => Self::undoc(Dec, Extended, 7),
            0x7C => Self::new(Inc, Extended, 7),
            0x7D => Self::new(Tst, Extended, 7),
            0x7E => Self::new(Jmp, Extended, 4),
            0x7F => Self::new(Clr, Extended, 7),

            0x80 => Self::new(Suba, Immediate8, 2),
            0x81 => Self::new(Cmpa, Immediate8, 2),
            0x82 => Self::new(Sbca, Immediate8, 2),
            0x83 => Self::new(Subd, Immediate16, 4),
            0x84 => Self::new(Anda, Immediate8, 2),
            0x85 => Self::new(Bita, Immediate8, 2),
            0x86 => Self::new(Lda, Immediate8, 2),
            0x88 => Self::new(Eora, Immediate8, 2),
            0x89 => Self::new(Adca, Immediate8, 2),
            0x8A => Self::new(Ora, Immediate8, 2),
            0x8B => Self::new(Adda, Immediate8, 2),
            0x8C => Self::new(Cmpx, Immediate16, 4),
            0x8D => Self::new(Bsr, Relative8, 7),
            0x8E => Self::new(Ldx, Immediate16, 3),

            0x90 => Self::new(Suba, Direct, 4),
            0x91 => Self::new(Cmpa, Direct, 4),
            0x92 => Self::new(Sbca, Direct, 4),
            0x93 => Self::new(Subd, Direct, 6),
            0x94 => Self::new(Anda, Direct, 4),
            0x95 => Self::new(Bita, Direct, 4),
            0x96 => Self::new(Lda, Direct, 4),
            0x97 => Self::new(Sta, Direct, 4),
            0x98 => Self::new(Eora, Direct, 4),
            0x99 => Self::new(Adca, Direct, 4),
            0x9A => Self::new(Ora, Direct, 4),
            0x9B => Self::new(Adda, Direct, 4),
            0x9C => Self::new(Cmpx, Direct, 6),
            0x9D => Self::new(Jsr, Direct, 7),
            0x9E => Self::new(Ldx, Direct, 5),
            0x9F => Self::new(Stx, Direct, 5),

            0xA0 => Self::new(Suba, Indexed, 4),
            0xA1 => Self::new(Cmpa, Indexed, 4),
            0xA2 => Self::new(Sbca, Indexed, 4),
            0xA3 => Self::new(Subd, Indexed, 6),
            0xA4 => Self::new(Anda, Indexed, 4),
            0xA5 => Self::new(Bita, Indexed, 4),
            0xA6 => Self::new(Lda, Indexed, 4),
            0xA7 => Self::new(Sta, Indexed, 4),
            0xA8 => Self::new(Eora, Indexed, 4),
            0xA9 => Self::new(Adca, Indexed, 4),
            0xAA => Self::new(Ora, Indexed, 4),
            0xAB => Self::new(Adda, Indexed, 4),
            0xAC => Self::new(Cmpx, Indexed, 6),
            0xAD => Self::new(Jsr, Indexed, 7),
            0xAE => Self::new(Ldx, Indexed, 5),
            0xAF => Self::new(Stx, Indexed, 5),

            0xB0 => Self::new(Suba, Extended, 5),
            0xB1 => Self::new(Cmpa, Extended, 5),
            0xB2 => Self::new(Sbca, Extended, 5),
            0xB3 => Self::new(Subd, Extended, 7),
            0xB4 => Self::new(Anda, Extended, 5),
            0xB5 => Self::new(Bita, Extended, 5),
            0xB6 => Self::new(Lda, Extended, 5),
            0xB7 => Self::new(Sta, Extended, 5),
            0xB8 => Self::new(Eora, Extended, 5),
            0xB9 => Self::new(Adca, Extended, 5),
            0xBA => Self::new(Ora, Extended, 5),
            0xBB => Self::new(Adda, Extended, 5),
            0xBC => Self::new(Cmpx, Extended, 7),
            0xBD => Self::new(Jsr, Extended, 8),
            0xBE => Self::new(Ldx, Extended, 6),
            0xBF => Self::new(Stx, Extended, 6),

            0xC0 => Self::new(Subb, Immediate8, 2),
            0xC1 => Self::new(Cmpb, Immediate8, 2),
            0xC2 => Self::new(Sbcb, Immediate8, 2),
            0xC3 => Self::new(Addd, Immediate16, 4),
            0xC4 => Self::new(Andb, Immediate8, 2),
            0xC5 => Self::new(Bitb, Immediate8, 2),
            0xC6 => Self::new(Ldb, Immediate8, 2),
            0xC8 => Self::new(Eorb, Immediate8, 2),
            0xC9 => Self::new(Adcb, Immediate8, 2),
            0xCA => Self::new(Orb, Immediate8, 2),
            0xCB => Self::new(Addb, Immediate8, 2),
            0xCC => Self::new(Ldd, Immediate16, 3),
            0xCE => Self::new(Ldu, Immediate16, 3),

            0xD0 => Self::new(Subb, Direct, 4),
            0xD1 => Self::new(Cmpb, Direct, 4),
            0xD2 => Self::new(Sbcb, Direct, 4),
            0xD3 => Self::new(Addd, Direct, 6),
            0xD4 => Self::new(Andb, Direct, 4),
            0xD5 => Self::new(Bitb, Direct, 4),
            0xD6 => Self::new(Ldb, Direct, 4),
            0xD7 => Self::new(Stb, Direct, 4),
            0xD8 => Self::new(Eorb, Direct, 4),
            0xD9 => Self::new(Adcb, Direct, 4),
            0xDA => Self::new(Orb, Direct, 4),
            0xDB => Self::new(Addb, Direct, 4),
            0xDC => Self::new(Ldd, Direct, 5),
            0xDD => Self::new(Std, Direct, 5),
            0xDE => Self::new(Ldu, Direct, 5),
            0xDF => Self::new(Stu, Direct, 5),

            0xE0 => Self::new(Subb, Indexed, 4),
            0xE1 => Self::new(Cmpb, Indexed, 4),
            0xE2 => Self::new(Sbcb, Indexed, 4),
            0xE3 => Self::new(Addd, Indexed, 6),
            0xE4 => Self::new(Andb, Indexed, 4),
            0xE5 => Self::new(Bitb, Indexed, 4),
            0xE6 => Self::new(Ldb, Indexed, 4),
            0xE7 => Self::new(Stb, Indexed, 4),
            0xE8 => Self::new(Eorb, Indexed, 4),
            0xE9 => Self::new(Adcb, Indexed, 4),
            0xEA => Self::new(Orb, Indexed, 4),
            0xEB => Self::new(Addb, Indexed, 4),
            0xEC => Self::new(Ldd, Indexed, 5),
            0xED => Self::new(Std, Indexed, 5),
            0xEE => Self::new(Ldu, Indexed, 5),
            0xEF => Self::new(Stu, Indexed, 5),

            0xF0 => Self::new(Subb, Extended, 5),
            0xF1 => Self::new(Cmpb, Extended, 5),
            0xF2 => Self::new(Sbcb, Extended, 5),
            0xF3 => Self::new(Addd, Extended, 7),
            0xF4 => Self::new(Andb, Extended, 5),
            0xF5 => Self::new(Bitb, Extended, 5),
            0xF6 => Self::new(Ldb, Extended, 5),
            0xF7 => Self::new(Stb, Extended, 5),
            0xF8 => Self::new(Eorb, Extended, 5),
            0xF9 => Self::new(Adcb, Extended, 5),
            0xFA => Self::new(Orb, Extended, 5),
            0xFB => Self::new(Addb, Extended, 5),
            0xFC => Self::new(Ldd, Extended, 6),
            0xFD => Self::new(Std, Extended, 6),
            0xFE => Self::new(Ldu, Extended, 6),
            0xFF => Self::new(Stu, Extended, 6),

            _ => return None,
        })
    }

    fn page2_6809(opcode: u8) -> Option<Self> {
        use AddressingMode::*;
        use Mnemonic::*;

        Some(match opcode {
            0x21 => Self::new(Lbrn, Relative16, 5),
            0x22 => Self::new(Lbhi, Relative16, 5),
            0x23 => Self::new(Lbls, Relative16, 5),
            0x24 => Self::new(Lbcc, Relative16, 5),
            0x25 => Self::new(Lbcs, Relative16, 5),
            0x26 => Self::new(Lbne, Relative16, 5),
            0x27 => Self::new(Lbeq, Relative16, 5),
            0x28 => Self::new(Lbvc, Relative16, 5),
            0x29 => Self::new(Lbvs, Relative16, 5),
            0x2A => Self::new(Lbpl, Relative16, 5),
            0x2B => Self::new(Lbmi, Relative16, 5),
            0x2C => Self::new(Lbge, Relative16, 5),
            0x2D => Self::new(Lblt, Relative16, 5),
            0x2E => Self::new(Lbgt, Relative16, 5),
            0x2F => Self::new(Lble, Relative16, 5),
            0x3F => Self::new(Swi2, Inherent, 20),

            0x83 => Self::new(Cmpd, Immediate16, 5),
            0x8C => Self::new(Cmpy, Immediate16, 5),
            0x8E => Self::new(Ldy, Immediate16, 4),
            0x93 => Self::new(Cmpd, Direct, 7),
            0x9C => Self::new(Cmpy, Direct, 7),
            0x9E => Self::new(Ldy, Direct, 6),
            0x9F => Self::new(Sty, Direct, 6),
            0xA3 => Self::new(Cmpd, Indexed, 7),
            0xAC => Self::new(Cmpy, Indexed, 7),
            0xAE => Self::new(Ldy, Indexed, 6),
            0xAF => Self::new(Sty, Indexed, 6),
            0xB3 => Self::new(Cmpd, Extended, 8),
            0xBC => Self::new(Cmpy, Extended, 8),
            0xBE => Self::new(Ldy, Extended, 7),
            0xBF => Self::new(Sty, Extended, 7),

            0xCE => Self::new(Lds, Immediate16, 4),
            0xDE => Self::new(Lds, Direct, 6),
            0xDF => Self::new(Sts, Direct, 6),
            0xEE => Self::new(Lds, Indexed, 6),
            0xEF => Self::new(Sts, Indexed, 6),
            0xFE => Self::new(Lds, Extended, 7),
            0xFF => Self::new(Sts, Extended, 7),

            _ => return None,
        })
    }

    fn page3_6809(opcode: u8) -> Option<Self> {
        use AddressingMode::*;
        use Mnemonic::*;

        Some(match opcode {
            0x3F => Self::new(Swi3, Inherent, 20),
            0x83 => Self::new(Cmpu, Immediate16, 5),
            0x8C => Self::new(Cmps, Immediate16, 5),
            0x93 => Self::new(Cmpu, Direct, 7),
            0x9C => Self::new(Cmps, Direct, 7),
            0xA3 => Self::new(Cmpu, Indexed, 7),
            0xAC => Self::new(Cmps, Indexed, 7),
            0xB3 => Self::new(Cmpu, Extended, 8),
            0xBC => Self::new(Cmps, Extended, 8),
            _ => return None,
        })
    }

    fn page0_6309(opcode: u8) -> Option<Self> {
        use AddressingMode::*;
        use Mnemonic::*;

        Some(match opcode {
            0x01 => Self::new(Oim, DirectImmediate, 6),
            0x02 => Self::new(Aim, DirectImmediate, 6),
            0x05 => Self::new(Eim, DirectImmediate, 6),
            0x0B => Self::new(Tim, DirectImmediate, 6),
            0x14 => Self::new(Sexw, Inherent, 4),
            0x61 => Self::new(Oim, IndexedImmediate, 7),
            0x62 => Self::new(Aim, IndexedImmediate, 7),
            0x65 => Self::new(Eim, IndexedImmediate, 7),
            0x6B => Self::new(Tim, IndexedImmediate, 7),
            0x71 => Self::new(Oim, ExtendedImmediate, 7),
            0x72 => Self::new(Aim, ExtendedImmediate, 7),
            0x75 => Self::new(Eim, ExtendedImmediate, 7),
            0x7B => Self::new(Tim, ExtendedImmediate, 7),
            0xCD => Self::new(Ldq, Immediate32, 5),
            _ => return None,
        })
    }

    fn page2_6309(opcode: u8) -> Option<Self> {
        use AddressingMode::*;
        use Mnemonic::*;

        Some(match opcode {
            0x30 => Self::new(Addr, Register, 4),
            0x31 => Self::new(Adcr, Register, 4),
            0x32 => Self::new(Subr, Register, 4),
            0x33 => Self::new(Sbcr, Register, 4),
            0x34 => Self::new(Andr, Register, 4),
            0x35 => Self::new(Orr, Register, 4),
            0x36 => Self::new(Eorr, Register, 4),
            0x37 => Self::new(Cmpr, Register, 4),
            0x38 => Self::new(Pshsw, Inherent, 6),
            0x39 => Self::new(Pulsw, Inherent, 6),
            0x3A => Self::new(Pshuw, Inherent, 6),
            0x3B => Self::new(Puluw, Inherent, 6),

            0x40 => Self::new(Negd, Inherent, 3),
            0x43 => Self::new(Comd, Inherent, 3),
            0x44 => Self::new(Lsrd, Inherent, 3),
            0x46 => Self::new(Rord, Inherent, 3),
            0x47 => Self::new(Asrd, Inherent, 3),
            0x48 => Self::new(Asld, Inherent, 3),
            0x49 => Self::new(Rold, Inherent, 3),
            0x4A => Self::new(Decd, Inherent, 3),
            0x4C => Self::new(Incd, Inherent, 3),
            0x4D => Self::new(Tstd, Inherent, 3),
            0x4F => Self::new(Clrd, Inherent, 3),
            0x53 => Self::new(Comw, Inherent, 3),
            0x54 => Self::new(Lsrw, Inherent, 3),
            0x56 => Self::new(Rorw, Inherent, 3),
            0x59 => Self::new(Rolw, Inherent, 3),
            0x5A => Self::new(Decw, Inherent, 3),
            0x5C => Self::new(Incw, Inherent, 3),
            0x5D => Self::new(Tstw, Inherent, 3),
            0x5F => Self::new(Clrw, Inherent, 3),

            0x80 => Self::new(Subw, Immediate16, 5),
            0x81 => Self::new(Cmpw, Immediate16, 5),
            0x82 => Self::new(Sbcd, Immediate16, 5),
            0x84 => Self::new(Andd, Immediate16, 5),
            0x85 => Self::new(Bitd, Immediate16, 5),
            0x86 => Self::new(Ldw, Immediate16, 4),
            0x88 => Self::new(Eord, Immediate16, 5),
            0x89 => Self::new(Adcd, Immediate16, 5),
            0x8A => Self::new(Ord, Immediate16, 5),
            0x8B => Self::new(Addw, Immediate16, 5),

            0x90 => Self::new(Subw, Direct, 7),
            0x91 => Self::new(Cmpw, Direct, 7),
            0x92 => Self::new(Sbcd, Direct, 7),
            0x94 => Self::new(Andd, Direct, 7),
            0x95 => Self::new(Bitd, Direct, 7),
            0x96 => Self::new(Ldw, Direct, 6),
            0x97 => Self::new(Stw, Direct, 6),
            0x98 => Self::new(Eord, Direct, 7),
            0x99 => Self::new(Adcd, Direct, 7),
            0x9A => Self::new(Ord, Direct, 7),
            0x9B => Self::new(Addw, Direct, 7),

            0xA0 => Self::new(Subw, Indexed, 7),
            0xA1 => Self::new(Cmpw, Indexed, 7),
            0xA2 => Self::new(Sbcd, Indexed, 7),
            0xA4 => Self::new(Andd, Indexed, 7),
            0xA5 => Self::new(Bitd, Indexed, 7),
            0xA6 => Self::new(Ldw, Indexed, 6),
            0xA7 => Self::new(Stw, Indexed, 6),
            0xA8 => Self::new(Eord, Indexed, 7),
            0xA9 => Self::new(Adcd, Indexed, 7),
            0xAA => Self::new(Ord, Indexed, 7),
            0xAB => Self::new(Addw, Indexed, 7),

            0xB0 => Self::new(Subw, Extended, 8),
            0xB1 => Self::new(Cmpw, Extended, 8),
            0xB2 => Self::new(Sbcd, Extended, 8),
            0xB4 => Self::new(Andd, Extended, 8),
            0xB5 => Self::new(Bitd, Extended, 8),
            0xB6 => Self::new(Ldw, Extended, 7),
            0xB7 => Self::new(Stw, Extended, 7),
            0xB8 => Self::new(Eord, Extended, 8),
            0xB9 => Self::new(Adcd, Extended, 8),
            0xBA => Self::new(Ord, Extended, 8),
            0xBB => Self::new(Addw, Extended, 8),

            0xDC => Self::new(Ldq, Direct, 8),
            0xDD => Self::new(Stq, Direct, 8),
            0xEC => Self::new(Ldq, Indexed, 8),
            0xED => Self::new(Stq, Indexed, 8),
            0xFC => Self::new(Ldq, Extended, 9),
            0xFD => Self::new(Stq, Extended, 9),

            _ => return None,
        })
    }

    fn page3_6309(opcode: u8) -> Option<Self> {
        use AddressingMode::*;
        use Mnemonic::*;

        Some(match opcode {
            0x30 => Self::new(Band, DirectBit, 7),
            0x31 => Self::new(Biand, DirectBit, 7),
            0x32 => Self::new(Bor, DirectBit, 7),
            0x33 => Self::new(Bior, DirectBit, 7),
            0x34 => Self::new(Beor, DirectBit, 7),
            0x35 => Self::new(Bieor, DirectBit, 7),
            0x36 => Self::new(Ldbt, DirectBit, 7),
            0x37 => Self::new(Stbt, DirectBit, 8),
            0x38..=0x3B => Self::new(Tfm, Register, 6),
            0x3C => Self::new(Bitmd, Immediate8, 4),
            0x3D => Self::new(Ldmd, Immediate8, 5),

            0x43 => Self::new(Come, Inherent, 3),
            0x4A => Self::new(Dece, Inherent, 3),
            0x4C => Self::new(Ince, Inherent, 3),
            0x4D => Self::new(Tste, Inherent, 3),
            0x4F => Self::new(Clre, Inherent, 3),
            0x53 => Self::new(Comf, Inherent, 3),
            0x5A => Self::new(Decf, Inherent, 3),
            0x5C => Self::new(Incf, Inherent, 3),
            0x5D => Self::new(Tstf, Inherent, 3),
            0x5F => Self::new(Clrf, Inherent, 3),

            0x80 => Self::new(Sube, Immediate8, 3),
            0x81 => Self::new(Cmpe, Immediate8, 3),
            0x86 => Self::new(Lde, Immediate8, 3),
            0x8B => Self::new(Adde, Immediate8, 3),
            0x8D => Self::new(Divd, Immediate8, 25),
            0x8E => Self::new(Divq, Immediate16, 34),
            0x8F => Self::new(Muld, Immediate16, 28),

            0x90 => Self::new(Sube, Direct, 5),
            0x91 => Self::new(Cmpe, Direct, 5),
            0x96 => Self::new(Lde, Direct, 5),
            0x97 => Self::new(Ste, Direct, 5),
            0x9B => Self::new(Adde, Direct, 5),
            0x9D => Self::new(Divd, Direct, 27),
            0x9E => Self::new(Divq, Direct, 36),
            0x9F => Self::new(Muld, Direct, 30),

            0xA0 => Self::new(Sube, Indexed, 5),
            0xA1 => Self::new(Cmpe, Indexed, 5),
            0xA6 => Self::new(Lde, Indexed, 5),
            0xA7 => Self::new(Ste, Indexed, 5),
            0xAB => Self::new(Adde, Indexed, 5),
            0xAD => Self::new(Divd, Indexed, 27),
            0xAE => Self::new(Divq, Indexed, 36),
            0xAF => Self::new(Muld, Indexed, 30),

            0xB0 => Self::new(Sube, Extended, 6),
            0xB1 => Self::new(Cmpe, Extended, 6),
            0xB6 => Self::new(Lde, Extended, 6),
            0xB7 => Self::new(Ste, Extended, 6),
            0xBB => Self::new(Adde, Extended, 6),
            0xBD => Self::new(Divd, Extended, 28),
            0xBE => Self::new(Divq, Extended, 37),
            0xBF => Self::new(Muld, Extended, 31),

            0xC0 => Self::new(Subf, Immediate8, 3),
            0xC1 => Self::new(Cmpf, Immediate8, 3),
            0xC6 => Self::new(Ldf, Immediate8, 3),
            0xCB => Self::new(Addf, Immediate8, 3),

            0xD0 => Self::new(Subf, Direct, 5),
            0xD1 => Self::new(Cmpf, Direct, 5),
            0xD6 => Self::new(Ldf, Direct, 5),
            0xD7 => Self::new(Stf, Direct, 5),
            0xDB => Self::new(Addf, Direct, 5),

            0xE0 => Self::new(Subf, Indexed, 5),
            0xE1 => Self::new(Cmpf, Indexed, 5),
            0xE6 => Self::new(Ldf, Indexed, 5),
            0xE7 => Self::new(Stf, Indexed, 5),
            0xEB => Self::new(Addf, Indexed, 5),

            0xF0 => Self::new(Subf, Extended, 6),
            0xF1 => Self::new(Cmpf, Extended, 6),
            0xF6 => Self::new(Ldf, Extended, 6),
            0xF7 => Self::new(Stf, Extended, 6),
            0xFB => Self::new(Addf, Extended, 6),

            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_basics() {
        let lda = OpcodeInfo::lookup(0, 0x86, CpuType::Cpu6809);
        assert_eq!(lda.mnemonic, Mnemonic::Lda);
        assert_eq!(lda.mode, AddressingMode::Immediate8);
        assert_eq!(lda.base_cycles, 2);

        let ldy = OpcodeInfo::lookup(0x10, 0x8E, CpuType::Cpu6809);
        assert_eq!(ldy.mnemonic, Mnemonic::Ldy);
        assert_eq!(ldy.mode, AddressingMode::Immediate16);
    }

    #[test]
    fn illegal_slots() {
        assert_eq!(OpcodeInfo::lookup(0, 0x38, CpuType::Cpu6809), OpcodeInfo::ILLEGAL);
        assert_eq!(OpcodeInfo::lookup(0x10, 0x00, CpuType::Cpu6809), OpcodeInfo::ILLEGAL);
        // LDQ immediate only exists on the 6309.
        assert_eq!(OpcodeInfo::lookup(0, 0xCD, CpuType::Cpu6809), OpcodeInfo::ILLEGAL);
        assert_eq!(OpcodeInfo::lookup(0, 0xCD, CpuType::Cpu6309).mnemonic, Mnemonic::Ldq);
    }

    #[test]
    fn cpu_overlay() {
        // $01 is an undocumented NEG alias on the 6809, OIM on the 6309.
        let neg = OpcodeInfo::lookup(0, 0x01, CpuType::Cpu6809);
        assert_eq!(neg.mnemonic, Mnemonic::Neg);
        assert!(neg.undocumented);

        let oim = OpcodeInfo::lookup(0, 0x01, CpuType::Cpu6309);
        assert_eq!(oim.mnemonic, Mnemonic::Oim);
        assert_eq!(oim.mode, AddressingMode::DirectImmediate);
        assert!(!oim.undocumented);

        // $41 is not reassigned by the overlay, so the NEGA alias still
        // decodes on a 6309.
        for cpu in [CpuType::Cpu6809, CpuType::Cpu6309] {
            let nega = OpcodeInfo::lookup(0, 0x41, cpu);
            assert_eq!(nega.mnemonic, Mnemonic::Nega, "$41 on {:?}", cpu);
            assert!(nega.undocumented);
        }
    }

    #[test]
    fn mnemonic_spelling() {
        assert_eq!(Mnemonic::Lda.to_string(), "LDA");
        assert_eq!(Mnemonic::Lbcc.to_string(), "LBCC");
        assert_eq!(Mnemonic::Swi2.to_string(), "SWI2");
        assert_eq!(Mnemonic::Illegal.to_string(), "???");
    }
}
