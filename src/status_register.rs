// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 6809 condition code register and 6309 mode register, tri-state.

use crate::utils::{bit, tbit, zip_map};

/// The condition code register.
///
/// Every flag is tri-state: `None` means the emulator does not know the
/// flag's value. Flags become known as emulated instructions write them and
/// revert to unknown on divergence from the trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusRegister {
    /// Entire state on stack
    pub e: Option<bool>,
    /// FIRQ mask
    pub f: Option<bool>,
    /// Half carry
    pub h: Option<bool>,
    /// IRQ mask
    pub i: Option<bool>,
    /// Negative
    pub n: Option<bool>,
    /// Zero
    pub z: Option<bool>,
    /// Overflow
    pub v: Option<bool>,
    /// Carry
    pub c: Option<bool>,
}

impl StatusRegister {
    /// The all-unknown register.
    pub const UNKNOWN: Self = Self {
        e: None,
        f: None,
        h: None,
        i: None,
        n: None,
        z: None,
        v: None,
        c: None,
    };

    fn ra(&self) -> Option<bool> {
        Some(true)
    }

    fn rn(&self) -> Option<bool> {
        Some(false)
    }

    fn hi(&self) -> Option<bool> {
        zip_map(self.c, self.z, |c, z| !c && !z)
    }

    fn ls(&self) -> Option<bool> {
        zip_map(self.c, self.z, |c, z| c || z)
    }

    fn cc(&self) -> Option<bool> {
        self.c.map(|c| !c)
    }

    fn cs(&self) -> Option<bool> {
        self.c
    }

    fn ne(&self) -> Option<bool> {
        self.z.map(|z| !z)
    }

    fn eq(&self) -> Option<bool> {
        self.z
    }

    fn vc(&self) -> Option<bool> {
        self.v.map(|v| !v)
    }

    fn vs(&self) -> Option<bool> {
        self.v
    }

    fn pl(&self) -> Option<bool> {
        self.n.map(|n| !n)
    }

    fn mi(&self) -> Option<bool> {
        self.n
    }

    fn ge(&self) -> Option<bool> {
        zip_map(self.n, self.v, |n, v| n == v)
    }

    fn lt(&self) -> Option<bool> {
        zip_map(self.n, self.v, |n, v| n != v)
    }

    fn gt(&self) -> Option<bool> {
        match (self.z, zip_map(self.n, self.v, |n, v| n != v)) {
            (Some(z), Some(nv)) => Some(!z && !nv),
            // Z set alone is enough to refuse the branch.
            (Some(true), _) => Some(false),
            _ => None,
        }
    }

    fn le(&self) -> Option<bool> {
        match (self.z, zip_map(self.n, self.v, |n, v| n != v)) {
            (Some(z), Some(nv)) => Some(z || nv),
            (Some(true), _) => Some(true),
            _ => None,
        }
    }

    const CONDITIONS: [fn(&Self) -> Option<bool>; 16] = [
        Self::ra, Self::rn, Self::hi, Self::ls, Self::cc, Self::cs, Self::ne, Self::eq,
        Self::vc, Self::vs, Self::pl, Self::mi, Self::ge, Self::lt, Self::gt, Self::le,
    ];

    /// Evaluates branch condition `cc` (the low nibble of the branch opcode).
    /// `None` when a needed flag is unknown.
    pub fn condition(&self, cc: u8) -> Option<bool> {
        Self::CONDITIONS[cc as usize & 0x0F](self)
    }

    /// Loads every flag from a known byte.
    pub fn set_all(&mut self, ccr: u8) {
        self.e = Some(bit(ccr, 7));
        self.f = Some(bit(ccr, 6));
        self.h = Some(bit(ccr, 5));
        self.i = Some(bit(ccr, 4));
        self.n = Some(bit(ccr, 3));
        self.z = Some(bit(ccr, 2));
        self.v = Some(bit(ccr, 1));
        self.c = Some(bit(ccr, 0));
    }

    /// The register as a byte, `None` when any flag is unknown.
    pub fn as_byte(&self) -> Option<u8> {
        Some(
            (self.e? as u8) << 7
                | (self.f? as u8) << 6
                | (self.h? as u8) << 5
                | (self.i? as u8) << 4
                | (self.n? as u8) << 3
                | (self.z? as u8) << 2
                | (self.v? as u8) << 1
                | self.c? as u8,
        )
    }

    /// ANDs an immediate mask into the register (ANDCC). Cleared bits become
    /// known even when the flag was unknown.
    pub fn and_mask(&mut self, mask: u8) {
        let and = |flag: Option<bool>, m: bool| if m { flag } else { Some(false) };
        self.e = and(self.e, bit(mask, 7));
        self.f = and(self.f, bit(mask, 6));
        self.h = and(self.h, bit(mask, 5));
        self.i = and(self.i, bit(mask, 4));
        self.n = and(self.n, bit(mask, 3));
        self.z = and(self.z, bit(mask, 2));
        self.v = and(self.v, bit(mask, 1));
        self.c = and(self.c, bit(mask, 0));
    }

    /// ORs an immediate mask into the register (ORCC). Set bits become known.
    pub fn or_mask(&mut self, mask: u8) {
        let or = |flag: Option<bool>, m: bool| if m { Some(true) } else { flag };
        self.e = or(self.e, bit(mask, 7));
        self.f = or(self.f, bit(mask, 6));
        self.h = or(self.h, bit(mask, 5));
        self.i = or(self.i, bit(mask, 4));
        self.n = or(self.n, bit(mask, 3));
        self.z = or(self.z, bit(mask, 2));
        self.v = or(self.v, bit(mask, 1));
        self.c = or(self.c, bit(mask, 0));
    }

    /// Renders the flags as `EFHINZVC` with `?` for unknown bits.
    pub fn render(&self) -> String {
        [self.e, self.f, self.h, self.i, self.n, self.z, self.v, self.c]
            .iter()
            .map(|&f| tbit(f))
            .collect()
    }
}

/// The 6309 mode register. Only the two programmer-visible mode bits are
/// modelled; the DIV0/IL status bits surface through traps the trace shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeRegister {
    /// Native mode (NM): true when the 6309 runs with the faster timings.
    pub native: Option<bool>,
    /// FIRQ mode (FM): true when FIRQ stacks the entire state.
    pub firq_entire: Option<bool>,
}

impl ModeRegister {
    pub const UNKNOWN: Self = Self { native: None, firq_entire: None };

    /// Loads the mode bits from a known byte (LDMD operand).
    pub fn set(&mut self, md: u8) {
        self.native = Some(bit(md, 0));
        self.firq_entire = Some(bit(md, 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_follow_flags() {
        let mut sr = StatusRegister::UNKNOWN;
        assert_eq!(sr.condition(0x0), Some(true)); // BRA
        assert_eq!(sr.condition(0x1), Some(false)); // BRN
        assert_eq!(sr.condition(0x7), None); // BEQ with unknown Z

        sr.z = Some(true);
        assert_eq!(sr.condition(0x7), Some(true)); // BEQ
        assert_eq!(sr.condition(0x6), Some(false)); // BNE
        assert_eq!(sr.condition(0xF), Some(true)); // BLE via Z alone
        assert_eq!(sr.condition(0xE), Some(false)); // BGT refused via Z alone
    }

    #[test]
    fn masks_make_flags_known() {
        let mut sr = StatusRegister::UNKNOWN;
        sr.or_mask(0x50);
        assert_eq!(sr.i, Some(true));
        assert_eq!(sr.f, Some(true));
        assert_eq!(sr.c, None);

        sr.and_mask(0xEF); // clear I, keep the rest
        assert_eq!(sr.i, Some(false));
        assert_eq!(sr.f, Some(true));
        assert_eq!(sr.z, None);
    }

    #[test]
    fn byte_round_trip() {
        let mut sr = StatusRegister::UNKNOWN;
        assert_eq!(sr.as_byte(), None);
        sr.set_all(0xA5);
        assert_eq!(sr.as_byte(), Some(0xA5));
        assert_eq!(sr.render(), "10100101");
    }
}
