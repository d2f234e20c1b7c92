// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reference emulator.
//!
//! Each instruction is executed against its captured bus samples. Operands
//! come from the instruction bytes, from the data-bus values of the memory
//! cycles inside the window, or from the memory oracle when no bus cycle
//! witnessed the access. Every observable the emulator can predict (access
//! direction, data value, address parity) is cross-checked against the
//! capture; a disagreement sets the fail flag and taints the affected state.

use crate::M6809;
use crate::addressing_modes::{IndexRegister, IndexedKind, decode_postbyte};
use crate::exception::{InterruptKind, InterruptMatch, ResetMatch, Vector};
use crate::instruction::Instruction;
use crate::isa::{AddressingMode, Mnemonic, OpcodeInfo};
use crate::memory_access::{AccessKind, MemoryAccess};
use crate::sample::Sample;
use crate::status_register::StatusRegister;
use crate::utils::{bit, sext8, word, zip_map};

/// Registers moved by PSHS/PULS/PSHU/PULU, in push order (PC first).
/// The inter-register code 3 doubles as U or S depending on the stack.
const STACK_ORDER: [(u8, u8); 8] = [
    (0x5, 2), // PC
    (0x3, 2), // U (S for PSHU/PULU)
    (0x2, 2), // Y
    (0x1, 2), // X
    (0xB, 1), // DP
    (0x9, 1), // B
    (0x8, 1), // A
    (0xA, 1), // CC
];

impl M6809 {
    /// Applies a matched reset entry: documented reset state, PC from the
    /// vector bytes, everything else unknown.
    pub fn reset(&mut self, matched: &ResetMatch) {
        self.regs = crate::Registers::UNKNOWN;
        self.regs.pc = Some(matched.pc);
        self.regs.cc.i = Some(true);
        self.regs.cc.f = Some(true);
        self.regs.dp = Some(0);
        if self.cpu_type.is_6309() {
            // Reset leaves the 6309 in emulation mode.
            self.regs.md.set(0);
        }
    }

    /// Applies a matched hardware interrupt entry. The stacked bytes reveal
    /// the pre-interrupt register values, so an entry can clear taint as
    /// well as check it.
    pub fn interrupt(
        &mut self,
        window: &[Sample],
        matched: &InterruptMatch,
        memory: &mut dyn MemoryAccess,
    ) {
        let pushes = &window[matched.push_start..matched.push_start + matched.pushes];
        match matched.kind {
            InterruptKind::Firq => {
                self.unstack_state(pushes, false, memory);
                self.regs.cc.e = Some(false);
                self.regs.cc.i = Some(true);
                self.regs.cc.f = Some(true);
            }
            InterruptKind::Irq => {
                self.unstack_state(pushes, true, memory);
                self.regs.cc.e = Some(true);
                self.regs.cc.i = Some(true);
                // An NMI entry looks identical and would also set F; leave
                // it unknown rather than guess.
                self.regs.cc.f = None;
            }
        }
        self.regs.s = self.regs.s.map(|s| s.wrapping_sub(matched.pushes as u16));
        self.regs.pc = Some(matched.pc);
    }

    /// Learns the pre-entry register values from a stacked-state push burst
    /// (hardware interrupt, SWI family or CWAI). `full` selects the whole
    /// register set over the FIRQ PC+CC form.
    fn unstack_state(&mut self, pushes: &[Sample], full: bool, memory: &mut dyn MemoryAccess) {
        // Push order on the bus: PCL PCH [UL UH YL YH XL XH DP B A] CC.
        let byte = |i: usize| pushes.get(i).map(|s| s.data);
        let check_pc = Self::word_at(byte(1), byte(0));
        if let (Some(stacked), Some(pc)) = (check_pc, self.regs.pc) {
            if stacked != pc {
                self.fail("stacked PC differs from predicted PC");
                self.regs.pc = Some(stacked);
            }
        } else if check_pc.is_some() {
            self.regs.pc = check_pc;
        }

        if full {
            self.check_learn16_pair(byte(3), byte(2), |regs| &mut regs.u, "U");
            self.check_learn16_pair(byte(5), byte(4), |regs| &mut regs.y, "Y");
            self.check_learn16_pair(byte(7), byte(6), |regs| &mut regs.x, "X");
            self.check_learn8(byte(8), |regs| &mut regs.dp, "DP");
            self.check_learn8(byte(9), |regs| &mut regs.b, "B");
            self.check_learn8(byte(10), |regs| &mut regs.a, "A");
            if let Some(cc) = byte(11) {
                self.regs.cc.set_all(cc);
            }
        } else if let Some(cc) = byte(2) {
            self.regs.cc.set_all(cc);
        }

        // Model the stack writes when S is known.
        if let Some(s) = self.regs.s {
            for (i, sample) in pushes.iter().enumerate() {
                let ea = s.wrapping_sub(i as u16 + 1);
                memory.write(sample, ea, AccessKind::Stack);
            }
        }
    }

    fn check_learn8(
        &mut self,
        bus: Option<u8>,
        reg: impl Fn(&mut crate::Registers) -> &mut Option<u8>,
        name: &str,
    ) {
        let Some(bus) = bus else { return };
        let slot = reg(&mut self.regs);
        if let Some(known) = *slot {
            if known != bus {
                *slot = Some(bus);
                self.fail(name);
                return;
            }
        }
        *reg(&mut self.regs) = Some(bus);
    }

    fn check_learn16_pair(
        &mut self,
        hi: Option<u8>,
        lo: Option<u8>,
        reg: impl Fn(&mut crate::Registers) -> &mut Option<u16>,
        name: &str,
    ) {
        let Some(bus) = Self::word_at(hi, lo) else { return };
        let slot = reg(&mut self.regs);
        if let Some(known) = *slot {
            if known != bus {
                *slot = Some(bus);
                self.fail(name);
                return;
            }
        }
        *reg(&mut self.regs) = Some(bus);
    }

    /// Executes one instruction against its captured samples.
    pub fn emulate(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
    ) {
        self.instruction_count += 1;

        self.check_fetch(samples, inst, memory);

        let next_pc = inst.pc.map(|pc| pc.wrapping_add(inst.length as u16));
        self.regs.pc = next_pc;

        self.dispatch(samples, inst, info, memory, next_pc);
    }

    /// The instruction byte stream occupies the first `length` cycles; they
    /// must all be reads, at consecutive addresses when A0 was captured.
    fn check_fetch(&mut self, samples: &[Sample], inst: &Instruction, memory: &mut dyn MemoryAccess) {
        for (i, sample) in samples.iter().take(inst.length as usize).enumerate() {
            if sample.rnw == Some(false) {
                self.fail("write cycle inside an instruction fetch");
            }
            if let Some(pc) = inst.pc {
                let addr = pc.wrapping_add(i as u16);
                if let Some(lsb) = sample.addr_lsb {
                    if lsb != (addr & 1 != 0) {
                        self.fail("fetch address parity");
                    }
                }
                memory.read(sample, addr, AccessKind::Instr);
            }
        }
    }

    fn dispatch(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
        next_pc: Option<u16>,
    ) {
        use Mnemonic::*;

        let cpu = self.cpu_type;
        match info.mnemonic {
            Illegal => {}

            // Loads.
            Lda | Ldb | Lde | Ldf => {
                let value = self.operand8(samples, inst, info, memory);
                match info.mnemonic {
                    Lda => self.regs.a = value,
                    Ldb => self.regs.b = value,
                    Lde => self.regs.e = value,
                    _ => self.regs.f = value,
                }
                self.nz8(value);
                self.regs.cc.v = Some(false);
            }
            Ldd | Ldx | Ldy | Ldu | Lds | Ldw => {
                let value = self.operand16(samples, inst, info, memory);
                match info.mnemonic {
                    Ldd => self.regs.set_d(value),
                    Ldx => self.regs.x = value,
                    Ldy => self.regs.y = value,
                    Ldu => self.regs.u = value,
                    Lds => self.regs.s = value,
                    _ => self.regs.set_w(value),
                }
                self.nz16(value);
                self.regs.cc.v = Some(false);
            }
            Ldq => {
                let value = self.operand32(samples, inst, info, memory);
                self.regs.set_q(value);
                self.regs.cc.n = value.map(|v| v & 0x8000_0000 != 0);
                self.regs.cc.z = value.map(|v| v == 0);
                self.regs.cc.v = Some(false);
            }

            // Stores. The witnessed write reveals the register value, so a
            // store clears taint as well as checking it.
            Sta | Stb | Ste | Stf => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 1);
                let predicted = match info.mnemonic {
                    Sta => self.regs.a,
                    Stb => self.regs.b,
                    Ste => self.regs.e,
                    _ => self.regs.f,
                };
                let value = self.store8(samples, 1, ea, predicted, memory);
                match info.mnemonic {
                    Sta => self.regs.a = value,
                    Stb => self.regs.b = value,
                    Ste => self.regs.e = value,
                    _ => self.regs.f = value,
                }
                self.nz8(value);
                self.regs.cc.v = Some(false);
            }
            Std | Stx | Sty | Stu | Sts | Stw => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 2);
                let predicted = match info.mnemonic {
                    Std => self.regs.d(),
                    Stx => self.regs.x,
                    Sty => self.regs.y,
                    Stu => self.regs.u,
                    Sts => self.regs.s,
                    _ => self.regs.w(),
                };
                let value = self.store16(samples, ea, predicted, memory);
                match info.mnemonic {
                    Std => self.regs.set_d(value),
                    Stx => self.regs.x = value,
                    Sty => self.regs.y = value,
                    Stu => self.regs.u = value,
                    Sts => self.regs.s = value,
                    _ => self.regs.set_w(value),
                }
                self.nz16(value);
                self.regs.cc.v = Some(false);
            }
            Stq => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 4);
                let hi = self.store16(
                    &samples[..samples.len().saturating_sub(2)],
                    ea,
                    self.regs.d(),
                    memory,
                );
                let lo = self.store16(samples, ea.map(|ea| ea.wrapping_add(2)), self.regs.w(), memory);
                self.regs.set_d(hi);
                self.regs.set_w(lo);
                let q = self.regs.q();
                self.regs.cc.n = q.map(|v| v & 0x8000_0000 != 0);
                self.regs.cc.z = q.map(|v| v == 0);
                self.regs.cc.v = Some(false);
            }

            // 8-bits ALU.
            Adda | Addb | Adde | Addf | Adca | Adcb => {
                let rhs = self.operand8(samples, inst, info, memory);
                let carry = matches!(info.mnemonic, Adca | Adcb);
                let lhs = self.acc8(info.mnemonic);
                let result = self.add8(lhs, rhs, carry);
                self.set_acc8(info.mnemonic, result);
            }
            Suba | Subb | Sube | Subf | Sbca | Sbcb => {
                let rhs = self.operand8(samples, inst, info, memory);
                let carry = matches!(info.mnemonic, Sbca | Sbcb);
                let lhs = self.acc8(info.mnemonic);
                let result = self.sub8(lhs, rhs, carry);
                self.set_acc8(info.mnemonic, result);
            }
            Cmpa | Cmpb | Cmpe | Cmpf => {
                let rhs = self.operand8(samples, inst, info, memory);
                let lhs = self.acc8(info.mnemonic);
                self.sub8(lhs, rhs, false);
            }
            Anda | Andb | Ora | Orb | Eora | Eorb => {
                let rhs = self.operand8(samples, inst, info, memory);
                let lhs = self.acc8(info.mnemonic);
                let result = match info.mnemonic {
                    Anda | Andb => zip_map(lhs, rhs, |a, b| a & b),
                    Ora | Orb => zip_map(lhs, rhs, |a, b| a | b),
                    _ => zip_map(lhs, rhs, |a, b| a ^ b),
                };
                self.set_acc8(info.mnemonic, result);
                self.nz8(result);
                self.regs.cc.v = Some(false);
            }
            Bita | Bitb => {
                let rhs = self.operand8(samples, inst, info, memory);
                let lhs = self.acc8(info.mnemonic);
                let result = zip_map(lhs, rhs, |a, b| a & b);
                self.nz8(result);
                self.regs.cc.v = Some(false);
            }

            // 16-bits ALU.
            Addd | Addw => {
                let rhs = self.operand16(samples, inst, info, memory);
                let lhs = if info.mnemonic == Addd { self.regs.d() } else { self.regs.w() };
                let result = self.add16(lhs, rhs, false);
                if info.mnemonic == Addd {
                    self.regs.set_d(result);
                } else {
                    self.regs.set_w(result);
                }
            }
            Adcd => {
                let rhs = self.operand16(samples, inst, info, memory);
                let result = self.add16(self.regs.d(), rhs, true);
                self.regs.set_d(result);
            }
            Subd | Subw => {
                let rhs = self.operand16(samples, inst, info, memory);
                let lhs = if info.mnemonic == Subd { self.regs.d() } else { self.regs.w() };
                let result = self.sub16(lhs, rhs, false);
                if info.mnemonic == Subd {
                    self.regs.set_d(result);
                } else {
                    self.regs.set_w(result);
                }
            }
            Sbcd => {
                let rhs = self.operand16(samples, inst, info, memory);
                let result = self.sub16(self.regs.d(), rhs, true);
                self.regs.set_d(result);
            }
            Cmpd | Cmpw | Cmpx | Cmpy | Cmpu | Cmps => {
                let rhs = self.operand16(samples, inst, info, memory);
                let lhs = match info.mnemonic {
                    Cmpd => self.regs.d(),
                    Cmpw => self.regs.w(),
                    Cmpx => self.regs.x,
                    Cmpy => self.regs.y,
                    Cmpu => self.regs.u,
                    _ => self.regs.s,
                };
                self.sub16(lhs, rhs, false);
            }
            Andd | Ord | Eord => {
                let rhs = self.operand16(samples, inst, info, memory);
                let result = match info.mnemonic {
                    Andd => zip_map(self.regs.d(), rhs, |a, b| a & b),
                    Ord => zip_map(self.regs.d(), rhs, |a, b| a | b),
                    _ => zip_map(self.regs.d(), rhs, |a, b| a ^ b),
                };
                self.regs.set_d(result);
                self.nz16(result);
                self.regs.cc.v = Some(false);
            }
            Bitd => {
                let rhs = self.operand16(samples, inst, info, memory);
                let result = zip_map(self.regs.d(), rhs, |a, b| a & b);
                self.nz16(result);
                self.regs.cc.v = Some(false);
            }

            // Memory read-modify-write.
            Neg | Com | Lsr | Ror | Asr | Asl | Rol | Dec | Inc | Clr => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 1);
                let value = self.read8(samples, 3, ea, AccessKind::Data, memory);
                let result = self.rmw_op(info.mnemonic, value);
                self.store8(samples, 1, ea, result, memory);
            }
            // TST trails two dead cycles, so its read sits deeper in the
            // window than the other read-only forms.
            Tst => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 1);
                let value = self.read8(samples, 3, ea, AccessKind::Data, memory);
                self.nz8(value);
                self.regs.cc.v = Some(false);
            }

            // Register read-modify-write.
            Nega | Coma | Lsra | Rora | Asra | Asla | Rola | Deca | Inca | Clra | Tsta => {
                let value = self.regs.a;
                let result = self.rmw_op(Self::rmw_kind(info.mnemonic), value);
                if info.mnemonic != Tsta {
                    self.regs.a = result;
                }
            }
            Negb | Comb | Lsrb | Rorb | Asrb | Aslb | Rolb | Decb | Incb | Clrb | Tstb => {
                let value = self.regs.b;
                let result = self.rmw_op(Self::rmw_kind(info.mnemonic), value);
                if info.mnemonic != Tstb {
                    self.regs.b = result;
                }
            }
            Negd | Comd | Lsrd | Rord | Asrd | Asld | Rold | Decd | Incd | Clrd | Tstd | Comw
            | Lsrw | Rorw | Rolw | Decw | Incw | Clrw | Tstw => {
                self.rmw16(info.mnemonic);
            }
            Come | Dece | Ince | Tste | Clre => {
                let value = self.regs.e;
                let result = self.rmw_op(Self::rmw_kind(info.mnemonic), value);
                if info.mnemonic != Tste {
                    self.regs.e = result;
                }
            }
            Comf | Decf | Incf | Tstf | Clrf => {
                let value = self.regs.f;
                let result = self.rmw_op(Self::rmw_kind(info.mnemonic), value);
                if info.mnemonic != Tstf {
                    self.regs.f = result;
                }
            }

            // 6309 bit-manipulation memory forms.
            Aim | Oim | Eim => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 1);
                let imm = inst.extra_immediate();
                let value = self.read8(samples, 3, ea, AccessKind::Data, memory);
                let result = match info.mnemonic {
                    Aim => value.map(|v| v & imm),
                    Oim => value.map(|v| v | imm),
                    _ => value.map(|v| v ^ imm),
                };
                self.nz8(result);
                self.regs.cc.v = Some(false);
                self.store8(samples, 1, ea, result, memory);
            }
            Tim => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 1);
                let imm = inst.extra_immediate();
                let value = self.read8(samples, 2, ea, AccessKind::Data, memory);
                let result = value.map(|v| v & imm);
                self.nz8(result);
                self.regs.cc.v = Some(false);
            }

            // Branches.
            Bra | Brn | Bhi | Bls | Bcc | Bcs | Bne | Beq | Bvc | Bvs | Bpl | Bmi | Bge | Blt
            | Bgt | Ble => {
                self.branch(inst, info, next_pc, inst.opcode & 0x0F);
            }
            Lbra => self.regs.pc = Self::branch_target(inst, info, next_pc),
            Lbrn | Lbhi | Lbls | Lbcc | Lbcs | Lbne | Lbeq | Lbvc | Lbvs | Lbpl | Lbmi | Lbge
            | Lblt | Lbgt | Lble => {
                self.branch(inst, info, next_pc, inst.opcode & 0x0F);
            }
            Bsr | Lbsr => {
                let ret = self.push_return(samples, next_pc, memory);
                // The stacked return address pins down an unknown PC
                // retroactively.
                let next_pc = next_pc.or(ret);
                self.regs.pc = Self::branch_target(inst, info, next_pc);
            }
            Jmp => {
                self.regs.pc = self.effective_address(samples, inst, info, memory, next_pc, 0);
            }
            Jsr => {
                let target = self.effective_address(samples, inst, info, memory, next_pc, 0);
                let ret = self.push_return(samples, next_pc, memory);
                let next_pc = next_pc.or(ret);
                let target = match target {
                    Some(target) => Some(target),
                    // A PCR-relative target resolves once the stacked
                    // return address pins down PC; modes whose registers
                    // are unknown recompute to unknown again.
                    None => self.effective_address(samples, inst, info, memory, next_pc, 0),
                };
                self.regs.pc = target;
            }
            Rts => {
                let hi = self.read8(samples, 3, None, AccessKind::Stack, memory);
                let lo = self.read8(samples, 2, None, AccessKind::Stack, memory);
                self.pull_fixup(2);
                self.regs.pc = Self::word_at(hi, lo);
            }
            Rti => self.rti(samples, memory),

            // Stack.
            Pshs | Pshu => self.push_list(samples, inst.postbyte, info.mnemonic == Pshs, memory),
            Puls | Pulu => self.pull_list(samples, inst.postbyte, info.mnemonic == Puls, memory),
            Pshsw | Pshuw => {
                let hardware = info.mnemonic == Pshsw;
                let f = self.store8(samples, 2, self.stack_ea(hardware, 1), self.regs.f, memory);
                let e = self.store8(samples, 1, self.stack_ea(hardware, 2), self.regs.e, memory);
                self.regs.f = f;
                self.regs.e = e;
                self.stack_adjust(hardware, -2);
            }
            Pulsw | Puluw => {
                let hardware = info.mnemonic == Pulsw;
                let e = self.read8(samples, 3, None, AccessKind::Stack, memory);
                let f = self.read8(samples, 2, None, AccessKind::Stack, memory);
                self.regs.e = e;
                self.regs.f = f;
                self.stack_adjust(hardware, 2);
            }

            // Register-to-register.
            Tfr => {
                let src = self.regs.get_inter(inst.postbyte >> 4, cpu);
                self.regs.set_inter(inst.postbyte, src, cpu);
            }
            Exg => {
                let src = self.regs.get_inter(inst.postbyte >> 4, cpu);
                let dst = self.regs.get_inter(inst.postbyte, cpu);
                self.regs.set_inter(inst.postbyte, src, cpu);
                self.regs.set_inter(inst.postbyte >> 4, dst, cpu);
            }
            Addr | Adcr | Subr | Sbcr | Andr | Orr | Eorr | Cmpr => {
                let src = self.regs.get_inter(inst.postbyte >> 4, cpu);
                let dst = self.regs.get_inter(inst.postbyte, cpu);
                let result = match info.mnemonic {
                    Addr => self.add16(dst, src, false),
                    Adcr => self.add16(dst, src, true),
                    Subr | Cmpr => self.sub16(dst, src, false),
                    Sbcr => self.sub16(dst, src, true),
                    Andr => {
                        let r = zip_map(dst, src, |a, b| a & b);
                        self.nz16(r);
                        self.regs.cc.v = Some(false);
                        r
                    }
                    Orr => {
                        let r = zip_map(dst, src, |a, b| a | b);
                        self.nz16(r);
                        self.regs.cc.v = Some(false);
                        r
                    }
                    _ => {
                        let r = zip_map(dst, src, |a, b| a ^ b);
                        self.nz16(r);
                        self.regs.cc.v = Some(false);
                        r
                    }
                };
                if info.mnemonic != Cmpr {
                    self.regs.set_inter(inst.postbyte, result, cpu);
                }
            }
            Tfm => self.tfm(inst),

            // Lea.
            Leax | Leay | Leas | Leau => {
                let ea = self.effective_address(samples, inst, info, memory, next_pc, 0);
                match info.mnemonic {
                    Leax => {
                        self.regs.x = ea;
                        self.regs.cc.z = ea.map(|ea| ea == 0);
                    }
                    Leay => {
                        self.regs.y = ea;
                        self.regs.cc.z = ea.map(|ea| ea == 0);
                    }
                    Leas => self.regs.s = ea,
                    _ => self.regs.u = ea,
                }
            }

            // Condition code masks.
            Orcc => self.regs.cc.or_mask(inst.postbyte),
            Andcc => self.regs.cc.and_mask(inst.postbyte),

            // Misc inherent.
            Nop | Sync => {}
            Daa => self.daa(),
            Sex => {
                let value = self.regs.b.map(|b| sext8(b));
                self.regs.set_d(value);
                self.nz16(value);
            }
            Sexw => {
                let value = self.regs.w().map(|w| if w & 0x8000 != 0 { 0xFFFF } else { 0 });
                self.regs.set_d(value);
                let q = self.regs.q();
                self.regs.cc.n = q.map(|q| q & 0x8000_0000 != 0);
                self.regs.cc.z = q.map(|q| q == 0);
            }
            Abx => {
                self.regs.x = zip_map(self.regs.x, self.regs.b.map(|b| b as u16), u16::wrapping_add);
            }
            Mul => {
                let result = zip_map(
                    self.regs.a.map(|a| a as u16),
                    self.regs.b.map(|b| b as u16),
                    |a, b| a.wrapping_mul(b),
                );
                self.regs.set_d(result);
                self.regs.cc.z = result.map(|r| r == 0);
                self.regs.cc.c = result.map(|r| r & 0x80 != 0);
            }
            Muld => {
                let rhs = self.operand16(samples, inst, info, memory);
                let result = zip_map(
                    self.regs.d().map(|d| (d as i16 as i32) as u32),
                    rhs.map(|r| (r as i16 as i32) as u32),
                    |a, b| (a as i32).wrapping_mul(b as i32) as u32,
                );
                self.regs.set_q(result);
                self.regs.cc.n = result.map(|r| r & 0x8000_0000 != 0);
                self.regs.cc.z = result.map(|r| r == 0);
            }
            Divd => {
                let rhs = self.operand8(samples, inst, info, memory);
                self.divd(rhs);
            }
            Divq => {
                let rhs = self.operand16(samples, inst, info, memory);
                self.divq(rhs);
            }

            Cwai => self.cwai(samples, inst, memory),
            Swi | Swi2 | Swi3 => self.swi(samples, info.mnemonic, memory),

            // 6309 bit transfers between a register and direct-page memory.
            Band | Biand | Bor | Bior | Beor | Bieor | Ldbt | Stbt => {
                self.register_bit_op(samples, inst, info, memory, next_pc);
            }

            Bitmd => {
                // The trap status bits are not modelled; the test result is
                // unknown unless the operand masks them both out.
                let mask = inst.operand8(info);
                self.regs.cc.z = if mask & 0xC0 == 0 { Some(true) } else { None };
                self.regs.cc.n = Some(false);
            }
            Ldmd => self.regs.md.set(inst.operand8(info)),
        }
    }

    // ---- operand access -------------------------------------------------

    fn acc8(&self, mnemonic: Mnemonic) -> Option<u8> {
        use Mnemonic::*;
        match mnemonic {
            Adda | Suba | Adca | Sbca | Cmpa | Anda | Ora | Eora | Bita => self.regs.a,
            Addb | Subb | Adcb | Sbcb | Cmpb | Andb | Orb | Eorb | Bitb => self.regs.b,
            Adde | Sube | Cmpe => self.regs.e,
            _ => self.regs.f,
        }
    }

    fn set_acc8(&mut self, mnemonic: Mnemonic, value: Option<u8>) {
        use Mnemonic::*;
        match mnemonic {
            Adda | Suba | Adca | Sbca | Anda | Ora | Eora => self.regs.a = value,
            Addb | Subb | Adcb | Sbcb | Andb | Orb | Eorb => self.regs.b = value,
            Adde | Sube => self.regs.e = value,
            Addf | Subf => self.regs.f = value,
            _ => {}
        }
    }

    /// The sample `k` cycles from the end of the window, the last cycle
    /// being `k = 1`.
    fn from_end(samples: &[Sample], k: usize) -> Option<&Sample> {
        if k == 0 {
            return None;
        }
        samples.len().checked_sub(k).map(|i| &samples[i])
    }

    /// Harvests a byte read `k` cycles from the window end, auditing it
    /// against the memory model when the address is known.
    fn read8(
        &mut self,
        samples: &[Sample],
        k: usize,
        ea: Option<u16>,
        kind: AccessKind,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u8> {
        let Some(sample) = Self::from_end(samples, k) else { return None };
        if sample.rnw == Some(false) {
            self.fail("expected a read cycle");
            return ea.and_then(|ea| memory.read_raw(ea));
        }
        if let (Some(ea), Some(lsb)) = (ea, sample.addr_lsb) {
            if lsb != (ea & 1 != 0) {
                self.fail("read address parity");
            }
        }
        let sample = *sample;
        if let Some(ea) = ea {
            memory.read(&sample, ea, kind);
        }
        Some(sample.data)
    }

    /// Cross-checks a byte write `k` cycles from the window end. The
    /// captured byte is authoritative and is returned so stores can clear
    /// taint.
    fn store8(
        &mut self,
        samples: &[Sample],
        k: usize,
        ea: Option<u16>,
        predicted: Option<u8>,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u8> {
        let Some(sample) = Self::from_end(samples, k) else { return predicted };
        if sample.rnw == Some(true) {
            self.fail("expected a write cycle");
            return predicted;
        }
        if let Some(predicted) = predicted {
            if predicted != sample.data {
                self.fail("written data differs from prediction");
            }
        }
        if let (Some(ea), Some(lsb)) = (ea, sample.addr_lsb) {
            if lsb != (ea & 1 != 0) {
                self.fail("write address parity");
            }
        }
        let sample = *sample;
        if let Some(ea) = ea {
            memory.write(&sample, ea, AccessKind::Data);
        }
        Some(sample.data)
    }

    /// Cross-checks a big-endian word write in the last two cycles.
    fn store16(
        &mut self,
        samples: &[Sample],
        ea: Option<u16>,
        predicted: Option<u16>,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u16> {
        let hi = self.store8(samples, 2, ea, predicted.map(|v| (v >> 8) as u8), memory);
        let lo = self.store8(samples, 1, ea.map(|ea| ea.wrapping_add(1)), predicted.map(|v| v as u8), memory);
        Self::word_at(hi, lo)
    }

    /// The 8-bits operand of the current instruction: immediate from the
    /// instruction bytes, otherwise the memory byte witnessed at the end of
    /// the window (or the oracle for dead cycles).
    fn operand8(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u8> {
        if info.mode == AddressingMode::Immediate8 {
            return Some(inst.operand8(info));
        }
        let ea = self.effective_address(samples, inst, info, memory, self.regs.pc, 1);
        self.read8(samples, 1, ea, AccessKind::Data, memory)
    }

    /// The 16-bits operand, high byte first on the bus.
    fn operand16(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u16> {
        if info.mode == AddressingMode::Immediate16 {
            return Some(inst.operand16(info));
        }
        let ea = self.effective_address(samples, inst, info, memory, self.regs.pc, 2);
        let hi = self.read8(samples, 2, ea, AccessKind::Data, memory);
        let lo = self.read8(samples, 1, ea.map(|ea| ea.wrapping_add(1)), AccessKind::Data, memory);
        Self::word_at(hi, lo)
    }

    /// The 32-bits operand (LDQ).
    fn operand32(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u32> {
        if info.mode == AddressingMode::Immediate32 {
            return Some(inst.operand32(info));
        }
        let ea = self.effective_address(samples, inst, info, memory, self.regs.pc, 4);
        let mut bytes = [None; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.read8(
                samples,
                4 - i,
                ea.map(|ea| ea.wrapping_add(i as u16)),
                AccessKind::Data,
                memory,
            );
        }
        let hi = Self::word_at(bytes[0], bytes[1]);
        let lo = Self::word_at(bytes[2], bytes[3]);
        zip_map(hi.map(|h| h as u32), lo.map(|l| l as u32), |h, l| h << 16 | l)
    }

    // ---- effective addresses --------------------------------------------

    /// Computes the effective address of a memory-referencing operand,
    /// applying indexed auto increment/decrement side effects.
    ///
    /// `data_len` is the width of the data access that terminates the
    /// window; it anchors the indirect pointer cycles.
    fn effective_address(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
        next_pc: Option<u16>,
        data_len: usize,
    ) -> Option<u16> {
        match info.mode.base() {
            AddressingMode::Direct => {
                self.regs.dp.map(|dp| word(dp, inst.operand8(info)))
            }
            AddressingMode::Extended => Some(inst.operand16(info)),
            AddressingMode::Indexed => self.indexed_address(samples, inst, info, memory, next_pc, data_len),
            _ => None,
        }
    }

    fn index_reg(&mut self, reg: IndexRegister) -> &mut Option<u16> {
        match reg {
            IndexRegister::X => &mut self.regs.x,
            IndexRegister::Y => &mut self.regs.y,
            IndexRegister::U => &mut self.regs.u,
            IndexRegister::S => &mut self.regs.s,
        }
    }

    fn indexed_address(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
        next_pc: Option<u16>,
        data_len: usize,
    ) -> Option<u16> {
        use IndexedKind::*;

        let entry = decode_postbyte(inst.postbyte, self.cpu_type);
        let op8 = inst.operand8(info);
        let op16 = inst.operand16(info);

        let ea = match entry.kind {
            Offset5(offset) => {
                (*self.index_reg(entry.reg)).map(|r| r.wrapping_add(offset as u16))
            }
            PostInc1 | PostInc2 => {
                let step = if entry.kind == PostInc1 { 1 } else { 2 };
                let reg = self.index_reg(entry.reg);
                let ea = *reg;
                *reg = reg.map(|r| r.wrapping_add(step));
                ea
            }
            PreDec1 | PreDec2 => {
                let step = if entry.kind == PreDec1 { 1 } else { 2 };
                let reg = self.index_reg(entry.reg);
                *reg = reg.map(|r| r.wrapping_sub(step));
                *reg
            }
            ZeroOffset => *self.index_reg(entry.reg),
            AccA => zip_map(*self.index_reg(entry.reg), self.regs.a.map(sext8), u16::wrapping_add),
            AccB => zip_map(*self.index_reg(entry.reg), self.regs.b.map(sext8), u16::wrapping_add),
            AccE => zip_map(*self.index_reg(entry.reg), self.regs.e.map(sext8), u16::wrapping_add),
            AccF => zip_map(*self.index_reg(entry.reg), self.regs.f.map(sext8), u16::wrapping_add),
            AccD => zip_map(*self.index_reg(entry.reg), self.regs.d(), u16::wrapping_add),
            AccW => zip_map(*self.index_reg(entry.reg), self.regs.w(), u16::wrapping_add),
            Offset8 => (*self.index_reg(entry.reg)).map(|r| r.wrapping_add(sext8(op8))),
            Offset16 => (*self.index_reg(entry.reg)).map(|r| r.wrapping_add(op16)),
            PcOffset8 => next_pc.map(|pc| pc.wrapping_add(sext8(op8))),
            PcOffset16 => next_pc.map(|pc| pc.wrapping_add(op16)),
            ExtendedIndirect => Some(op16),
            WZero => self.regs.w(),
            WOffset16 => self.regs.w().map(|w| w.wrapping_add(op16)),
            WPostInc2 => {
                let ea = self.regs.w();
                self.regs.set_w(ea.map(|w| w.wrapping_add(2)));
                ea
            }
            WPreDec2 => {
                let w = self.regs.w().map(|w| w.wrapping_sub(2));
                self.regs.set_w(w);
                w
            }
        };

        if entry.indirect {
            self.resolve_indirect(samples, ea, data_len, memory)
        } else {
            ea
        }
    }

    /// Resolves one level of indirection. The pointer word is read on the
    /// bus three cycles before the data access; the oracle answers when the
    /// window cannot (LEA/JMP have no data access to anchor on).
    fn resolve_indirect(
        &mut self,
        samples: &[Sample],
        pointer: Option<u16>,
        data_len: usize,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u16> {
        let hi_k = data_len + 4;
        let lo_k = data_len + 3;
        let from_bus = if data_len > 0 {
            let hi = Self::from_end(samples, hi_k).filter(|s| s.rnw != Some(false)).map(|s| s.data);
            let lo = Self::from_end(samples, lo_k).filter(|s| s.rnw != Some(false)).map(|s| s.data);
            Self::word_at(hi, lo)
        } else {
            None
        };

        let from_oracle = pointer.and_then(|p| {
            Self::word_at(memory.read_raw(p), memory.read_raw(p.wrapping_add(1)))
        });

        match (from_bus, from_oracle) {
            (Some(bus), Some(oracle)) => {
                if bus != oracle {
                    self.fail("indirect pointer differs from memory model");
                }
                Some(bus)
            }
            (Some(bus), None) => Some(bus),
            (None, oracle) => oracle,
        }
    }

    // ---- tri-state ALU ---------------------------------------------------

    fn nz8(&mut self, value: Option<u8>) {
        self.regs.cc.n = value.map(|v| v & 0x80 != 0);
        self.regs.cc.z = value.map(|v| v == 0);
    }

    fn nz16(&mut self, value: Option<u16>) {
        self.regs.cc.n = value.map(|v| v & 0x8000 != 0);
        self.regs.cc.z = value.map(|v| v == 0);
    }

    fn add8(&mut self, lhs: Option<u8>, rhs: Option<u8>, with_carry: bool) -> Option<u8> {
        let carry = if with_carry { self.regs.cc.c } else { Some(false) };
        match (lhs, rhs, carry) {
            (Some(a), Some(b), Some(c)) => {
                let wide = a as u16 + b as u16 + c as u16;
                let result = wide as u8;
                self.regs.cc.h = Some((a & 0x0F) + (b & 0x0F) + c as u8 > 0x0F);
                self.regs.cc.c = Some(wide > 0xFF);
                self.regs.cc.v = Some((a ^ result) & (b ^ result) & 0x80 != 0);
                self.nz8(Some(result));
                Some(result)
            }
            _ => {
                self.regs.cc.h = None;
                self.regs.cc.c = None;
                self.regs.cc.v = None;
                self.nz8(None);
                None
            }
        }
    }

    fn sub8(&mut self, lhs: Option<u8>, rhs: Option<u8>, with_carry: bool) -> Option<u8> {
        let carry = if with_carry { self.regs.cc.c } else { Some(false) };
        // H is undefined after a subtract.
        self.regs.cc.h = None;
        match (lhs, rhs, carry) {
            (Some(a), Some(b), Some(c)) => {
                let wide = (a as i16) - (b as i16) - (c as i16);
                let result = wide as u8;
                self.regs.cc.c = Some(wide < 0);
                self.regs.cc.v = Some((a ^ b) & (a ^ result) & 0x80 != 0);
                self.nz8(Some(result));
                Some(result)
            }
            _ => {
                self.regs.cc.c = None;
                self.regs.cc.v = None;
                self.nz8(None);
                None
            }
        }
    }

    fn add16(&mut self, lhs: Option<u16>, rhs: Option<u16>, with_carry: bool) -> Option<u16> {
        let carry = if with_carry { self.regs.cc.c } else { Some(false) };
        match (lhs, rhs, carry) {
            (Some(a), Some(b), Some(c)) => {
                let wide = a as u32 + b as u32 + c as u32;
                let result = wide as u16;
                self.regs.cc.c = Some(wide > 0xFFFF);
                self.regs.cc.v = Some((a ^ result) & (b ^ result) & 0x8000 != 0);
                self.nz16(Some(result));
                Some(result)
            }
            _ => {
                self.regs.cc.c = None;
                self.regs.cc.v = None;
                self.nz16(None);
                None
            }
        }
    }

    fn sub16(&mut self, lhs: Option<u16>, rhs: Option<u16>, with_carry: bool) -> Option<u16> {
        let carry = if with_carry { self.regs.cc.c } else { Some(false) };
        match (lhs, rhs, carry) {
            (Some(a), Some(b), Some(c)) => {
                let wide = (a as i32) - (b as i32) - (c as i32);
                let result = wide as u16;
                self.regs.cc.c = Some(wide < 0);
                self.regs.cc.v = Some((a ^ b) & (a ^ result) & 0x8000 != 0);
                self.nz16(Some(result));
                Some(result)
            }
            _ => {
                self.regs.cc.c = None;
                self.regs.cc.v = None;
                self.nz16(None);
                None
            }
        }
    }

    /// Maps the accumulator forms back to the memory-form mnemonic so one
    /// helper covers both.
    fn rmw_kind(mnemonic: Mnemonic) -> Mnemonic {
        use Mnemonic::*;
        match mnemonic {
            Nega | Negb => Neg,
            Coma | Comb | Come | Comf => Com,
            Lsra | Lsrb => Lsr,
            Rora | Rorb => Ror,
            Asra | Asrb => Asr,
            Asla | Aslb => Asl,
            Rola | Rolb => Rol,
            Deca | Decb | Dece | Decf => Dec,
            Inca | Incb | Ince | Incf => Inc,
            Tsta | Tstb | Tste | Tstf => Tst,
            Clra | Clrb | Clre | Clrf => Clr,
            m => m,
        }
    }

    /// One 8-bits read-modify-write operation with its flag updates.
    fn rmw_op(&mut self, mnemonic: Mnemonic, value: Option<u8>) -> Option<u8> {
        use Mnemonic::*;
        match mnemonic {
            Neg => {
                let result = value.map(|v| v.wrapping_neg());
                self.nz8(result);
                self.regs.cc.v = value.map(|v| v == 0x80);
                self.regs.cc.c = value.map(|v| v != 0);
                result
            }
            Com => {
                let result = value.map(|v| !v);
                self.nz8(result);
                self.regs.cc.v = Some(false);
                self.regs.cc.c = Some(true);
                result
            }
            Lsr => {
                let result = value.map(|v| v >> 1);
                self.regs.cc.c = value.map(|v| v & 1 != 0);
                self.regs.cc.n = Some(false);
                self.regs.cc.z = result.map(|v| v == 0);
                result
            }
            Ror => {
                let result = zip_map(value, self.regs.cc.c.map(|c| (c as u8) << 7), |v, c| v >> 1 | c);
                self.regs.cc.c = value.map(|v| v & 1 != 0);
                self.nz8(result);
                result
            }
            Asr => {
                let result = value.map(|v| (v as i8 >> 1) as u8);
                self.regs.cc.c = value.map(|v| v & 1 != 0);
                self.nz8(result);
                result
            }
            Asl => {
                let result = value.map(|v| v << 1);
                self.regs.cc.c = value.map(|v| v & 0x80 != 0);
                self.regs.cc.v = value.map(|v| (v ^ (v << 1)) & 0x80 != 0);
                self.nz8(result);
                result
            }
            Rol => {
                let result = zip_map(value, self.regs.cc.c.map(|c| c as u8), |v, c| v << 1 | c);
                self.regs.cc.c = value.map(|v| v & 0x80 != 0);
                self.regs.cc.v = value.map(|v| (v ^ (v << 1)) & 0x80 != 0);
                self.nz8(result);
                result
            }
            Dec => {
                let result = value.map(|v| v.wrapping_sub(1));
                self.nz8(result);
                self.regs.cc.v = value.map(|v| v == 0x80);
                result
            }
            Inc => {
                let result = value.map(|v| v.wrapping_add(1));
                self.nz8(result);
                self.regs.cc.v = value.map(|v| v == 0x7F);
                result
            }
            Tst => {
                self.nz8(value);
                self.regs.cc.v = Some(false);
                value
            }
            Clr => {
                self.regs.cc.n = Some(false);
                self.regs.cc.z = Some(true);
                self.regs.cc.v = Some(false);
                self.regs.cc.c = Some(false);
                Some(0)
            }
            _ => value,
        }
    }

    /// The 6309 D/W inherent read-modify-write group.
    fn rmw16(&mut self, mnemonic: Mnemonic) {
        use Mnemonic::*;
        let on_d = matches!(
            mnemonic,
            Negd | Comd | Lsrd | Rord | Asrd | Asld | Rold | Decd | Incd | Tstd | Clrd
        );
        let value = if on_d { self.regs.d() } else { self.regs.w() };

        let result = match mnemonic {
            Negd => {
                let r = value.map(|v| v.wrapping_neg());
                self.regs.cc.v = value.map(|v| v == 0x8000);
                self.regs.cc.c = value.map(|v| v != 0);
                r
            }
            Comd | Comw => {
                self.regs.cc.v = Some(false);
                self.regs.cc.c = Some(true);
                value.map(|v| !v)
            }
            Lsrd | Lsrw => {
                self.regs.cc.c = value.map(|v| v & 1 != 0);
                value.map(|v| v >> 1)
            }
            Rord | Rorw => {
                let r = zip_map(value, self.regs.cc.c.map(|c| (c as u16) << 15), |v, c| v >> 1 | c);
                self.regs.cc.c = value.map(|v| v & 1 != 0);
                r
            }
            Asrd => {
                self.regs.cc.c = value.map(|v| v & 1 != 0);
                value.map(|v| (v as i16 >> 1) as u16)
            }
            Asld => {
                self.regs.cc.c = value.map(|v| v & 0x8000 != 0);
                self.regs.cc.v = value.map(|v| (v ^ (v << 1)) & 0x8000 != 0);
                value.map(|v| v << 1)
            }
            Rold | Rolw => {
                let r = zip_map(value, self.regs.cc.c.map(|c| c as u16), |v, c| v << 1 | c);
                self.regs.cc.c = value.map(|v| v & 0x8000 != 0);
                r
            }
            Decd | Decw => {
                self.regs.cc.v = value.map(|v| v == 0x8000);
                value.map(|v| v.wrapping_sub(1))
            }
            Incd | Incw => {
                self.regs.cc.v = value.map(|v| v == 0x7FFF);
                value.map(|v| v.wrapping_add(1))
            }
            Tstd | Tstw => {
                self.regs.cc.v = Some(false);
                value
            }
            Clrd | Clrw => {
                self.regs.cc.v = Some(false);
                self.regs.cc.c = Some(false);
                Some(0)
            }
            _ => value,
        };

        self.nz16(result);
        if !matches!(mnemonic, Tstd | Tstw) {
            if on_d {
                self.regs.set_d(result);
            } else {
                self.regs.set_w(result);
            }
        }
    }

    // ---- control flow ----------------------------------------------------

    fn branch_target(inst: &Instruction, info: &OpcodeInfo, next_pc: Option<u16>) -> Option<u16> {
        let offset = if info.mode == AddressingMode::Relative8 {
            sext8(inst.operand8(info))
        } else {
            inst.operand16(info)
        };
        next_pc.map(|pc| pc.wrapping_add(offset))
    }

    fn branch(&mut self, inst: &Instruction, info: &OpcodeInfo, next_pc: Option<u16>, cc: u8) {
        match self.regs.cc.condition(cc) {
            Some(true) => self.regs.pc = Self::branch_target(inst, info, next_pc),
            Some(false) => self.regs.pc = next_pc,
            // Not knowing the predicate means not knowing where execution
            // went. The next fetch reveals it via divergence or LIC re-sync.
            None => self.regs.pc = None,
        }
    }

    /// BSR/JSR return address push: low byte then high byte in the last two
    /// cycles of the window. Returns the stacked return address, the bus
    /// copy of the PC the emulator may not have known.
    fn push_return(
        &mut self,
        samples: &[Sample],
        next_pc: Option<u16>,
        memory: &mut dyn MemoryAccess,
    ) -> Option<u16> {
        let lo = self.store8(
            samples,
            2,
            self.regs.s.map(|s| s.wrapping_sub(1)),
            next_pc.map(|pc| pc as u8),
            memory,
        );
        let hi = self.store8(
            samples,
            1,
            self.regs.s.map(|s| s.wrapping_sub(2)),
            next_pc.map(|pc| (pc >> 8) as u8),
            memory,
        );
        self.regs.s = self.regs.s.map(|s| s.wrapping_sub(2));
        Self::word_at(hi, lo)
    }

    fn pull_fixup(&mut self, bytes: u16) {
        self.regs.s = self.regs.s.map(|s| s.wrapping_add(bytes));
    }

    fn rti(&mut self, samples: &[Sample], memory: &mut dyn MemoryAccess) {
        // [opcode, dead, CC, ...]: the stacked CC decides how much more
        // comes off the stack.
        let Some(cc) = samples.get(2).map(|s| s.data) else { return };
        self.regs.cc.set_all(cc);

        let reads = |k: usize| samples.get(k).map(|s| s.data);
        if bit(cc, 7) {
            self.regs.a = reads(3);
            self.regs.b = reads(4);
            self.regs.dp = reads(5);
            self.regs.x = Self::word_at(reads(6), reads(7));
            self.regs.y = Self::word_at(reads(8), reads(9));
            self.regs.u = Self::word_at(reads(10), reads(11));
            self.regs.pc = Self::word_at(reads(12), reads(13));
            self.pull_fixup(12);
        } else {
            self.regs.pc = Self::word_at(reads(3), reads(4));
            self.pull_fixup(3);
        }

        if let Some(s) = self.regs.s {
            // Audit the pulls now that the final S is known.
            let pulled = if bit(cc, 7) { 12u16 } else { 3 };
            for k in 0..pulled {
                if let Some(sample) = samples.get(2 + k as usize) {
                    memory.read(sample, s.wrapping_sub(pulled).wrapping_add(k), AccessKind::Stack);
                }
            }
        }
    }

    /// PSHS/PSHU: the writes are the last `n` cycles of the window, in push
    /// order. Known registers are checked against the bus, unknown ones are
    /// learned from it.
    fn push_list(&mut self, samples: &[Sample], postbyte: u8, hardware: bool, memory: &mut dyn MemoryAccess) {
        let mut sp = self.stack_pointer(hardware);
        let total: usize = STACK_ORDER
            .iter()
            .enumerate()
            .filter(|(i, _)| bit(postbyte, 7 - *i as u8))
            .map(|(_, (_, width))| *width as usize)
            .sum();

        let mut k = total;
        for (i, (code, width)) in STACK_ORDER.iter().enumerate() {
            if !bit(postbyte, 7 - i as u8) {
                continue;
            }
            let code = if !hardware && *code == 0x3 { 0x4 } else { *code };
            let value = self.stacked_value(code, hardware);
            if *width == 2 {
                let lo = self.store8(samples, k, sp.map(|s| s.wrapping_sub(1)), value.map(|v| v as u8), memory);
                let hi = self.store8(samples, k - 1, sp.map(|s| s.wrapping_sub(2)), value.map(|v| (v >> 8) as u8), memory);
                self.learn_stacked(code, Self::word_at(hi, lo));
                sp = sp.map(|s| s.wrapping_sub(2));
                k -= 2;
            } else {
                let data = self.store8(samples, k, sp.map(|s| s.wrapping_sub(1)), value.map(|v| v as u8), memory);
                self.learn_stacked(code, data.map(|d| d as u16));
                sp = sp.map(|s| s.wrapping_sub(1));
                k -= 1;
            }
        }
        self.stack_adjust(hardware, -(total as i16));
    }

    /// PULS/PULU: the reads end one cycle before the end of the window, in
    /// reverse push order (CC first).
    fn pull_list(&mut self, samples: &[Sample], postbyte: u8, hardware: bool, memory: &mut dyn MemoryAccess) {
        let total: usize = STACK_ORDER
            .iter()
            .enumerate()
            .filter(|(i, _)| bit(postbyte, 7 - *i as u8))
            .map(|(_, (_, width))| *width as usize)
            .sum();

        let mut sp = self.stack_pointer(hardware);
        // First pulled byte is `total + 1` cycles from the end.
        let mut k = total + 1;
        for (i, (code, width)) in STACK_ORDER.iter().enumerate().rev() {
            if !bit(postbyte, 7 - i as u8) {
                continue;
            }
            let code = if !hardware && *code == 0x3 { 0x4 } else { *code };
            if *width == 2 {
                let hi = self.read8(samples, k, sp, AccessKind::Stack, memory);
                let lo = self.read8(samples, k - 1, sp.map(|s| s.wrapping_add(1)), AccessKind::Stack, memory);
                self.learn_stacked(code, Self::word_at(hi, lo));
                sp = sp.map(|s| s.wrapping_add(2));
                k -= 2;
            } else {
                let data = self.read8(samples, k, sp, AccessKind::Stack, memory);
                self.learn_stacked(code, data.map(|d| d as u16));
                sp = sp.map(|s| s.wrapping_add(1));
                k -= 1;
            }
        }
        self.stack_adjust(hardware, total as i16);
    }

    fn stack_pointer(&self, hardware: bool) -> Option<u16> {
        if hardware { self.regs.s } else { self.regs.u }
    }

    fn stack_ea(&self, hardware: bool, down: u16) -> Option<u16> {
        self.stack_pointer(hardware).map(|s| s.wrapping_sub(down))
    }

    fn stack_adjust(&mut self, hardware: bool, delta: i16) {
        let reg = if hardware { &mut self.regs.s } else { &mut self.regs.u };
        *reg = reg.map(|s| s.wrapping_add_signed(delta));
    }

    /// The value a stack op moves for an inter-register code, with CC and
    /// PC handled through their own accessors.
    fn stacked_value(&self, code: u8, _hardware: bool) -> Option<u16> {
        self.regs.get_inter(code, self.cpu_type).map(|v| v & if code >= 8 { 0xFF } else { 0xFFFF })
    }

    fn learn_stacked(&mut self, code: u8, value: Option<u16>) {
        self.regs.set_inter(code, value, self.cpu_type);
    }

    /// TFM block transfer. The per-byte cycles are not individually
    /// checked; the register outcome is architectural: W reaches zero, the
    /// pointers move W bytes.
    fn tfm(&mut self, inst: &Instruction) {
        let w = self.regs.w();
        let src = inst.postbyte >> 4;
        let dst = inst.postbyte & 0x0F;
        let (src_step, dst_step): (i32, i32) = match inst.opcode & 3 {
            0 => (1, 1),
            1 => (-1, -1),
            2 => (1, 0),
            _ => (0, 1),
        };

        let advance = |value: Option<u16>, step: i32, w: Option<u16>| {
            zip_map(value, w, |v, w| v.wrapping_add_signed((step * w as i32) as i16))
        };
        let cpu = self.cpu_type;
        let src_val = advance(self.regs.get_inter(src, cpu), src_step, w);
        let dst_val = advance(self.regs.get_inter(dst, cpu), dst_step, w);
        self.regs.set_inter(src, src_val, cpu);
        self.regs.set_inter(dst, dst_val, cpu);
        self.regs.set_w(Some(0));
        self.regs.cc.z = Some(true);
        self.regs.cc.n = Some(false);
    }

    fn daa(&mut self) {
        match (self.regs.a, self.regs.cc.h, self.regs.cc.c) {
            (Some(a), Some(h), Some(c)) => {
                let mut correction = 0u8;
                if h || a & 0x0F > 0x09 {
                    correction |= 0x06;
                }
                if c || a > 0x99 {
                    correction |= 0x60;
                }
                let result = a.wrapping_add(correction);
                self.regs.cc.c = Some(c || correction & 0x60 != 0);
                self.nz8(Some(result));
                self.regs.a = Some(result);
            }
            _ => {
                self.regs.a = None;
                self.nz8(None);
                self.regs.cc.c = None;
            }
        }
    }

    fn divd(&mut self, divisor: Option<u8>) {
        match (self.regs.d(), divisor) {
            (_, Some(0)) => {
                // Division by zero traps on real silicon; registers keep
                // their values and the flags come from the trap entry.
                log::warn!("DIVD divisor is zero");
                self.regs.cc.z = None;
                self.regs.cc.n = None;
                self.regs.cc.v = None;
                self.regs.cc.c = None;
            }
            (Some(d), Some(div)) => {
                let quotient = (d as i16 as i32) / (div as i8 as i32);
                let remainder = (d as i16 as i32) % (div as i8 as i32);
                if quotient > i8::MAX as i32 || quotient < i8::MIN as i32 {
                    self.regs.cc.v = Some(true);
                    self.regs.cc.n = Some(false);
                    self.regs.cc.z = Some(false);
                    self.regs.cc.c = Some(false);
                } else {
                    self.regs.b = Some(quotient as u8);
                    self.regs.a = Some(remainder as u8);
                    self.regs.cc.n = Some(quotient < 0);
                    self.regs.cc.z = Some(quotient == 0);
                    self.regs.cc.v = Some(false);
                    self.regs.cc.c = Some(quotient & 1 != 0);
                }
            }
            _ => {
                self.regs.a = None;
                self.regs.b = None;
                self.regs.cc.n = None;
                self.regs.cc.z = None;
                self.regs.cc.v = None;
                self.regs.cc.c = None;
            }
        }
    }

    fn divq(&mut self, divisor: Option<u16>) {
        match (self.regs.q(), divisor) {
            (_, Some(0)) => {
                log::warn!("DIVQ divisor is zero");
                self.regs.cc.z = None;
                self.regs.cc.n = None;
                self.regs.cc.v = None;
                self.regs.cc.c = None;
            }
            (Some(q), Some(div)) => {
                let quotient = (q as i32 as i64) / (div as i16 as i64);
                let remainder = (q as i32 as i64) % (div as i16 as i64);
                if quotient > i16::MAX as i64 || quotient < i16::MIN as i64 {
                    self.regs.cc.v = Some(true);
                    self.regs.cc.n = Some(false);
                    self.regs.cc.z = Some(false);
                    self.regs.cc.c = Some(false);
                } else {
                    self.regs.set_w(Some(quotient as u16));
                    self.regs.set_d(Some(remainder as u16));
                    self.regs.cc.n = Some(quotient < 0);
                    self.regs.cc.z = Some(quotient == 0);
                    self.regs.cc.v = Some(false);
                    self.regs.cc.c = Some(quotient & 1 != 0);
                }
            }
            _ => {
                self.regs.set_d(None);
                self.regs.set_w(None);
                self.regs.cc.n = None;
                self.regs.cc.z = None;
                self.regs.cc.v = None;
                self.regs.cc.c = None;
            }
        }
    }

    /// CWAI: mask CC, set E, stack the entire state, wait. The push burst
    /// sits somewhere after the two fetch cycles; find it by direction.
    fn cwai(&mut self, samples: &[Sample], inst: &Instruction, memory: &mut dyn MemoryAccess) {
        self.regs.cc.and_mask(inst.bytes[1]);
        self.regs.cc.e = Some(true);

        let push_start = samples.iter().position(|s| s.rnw == Some(false));
        if let Some(start) = push_start {
            if samples.len() >= start + 12 {
                self.unstack_state(&samples[start..start + 12], true, memory);
            }
        }
        self.regs.s = self.regs.s.map(|s| s.wrapping_sub(12));
        // PC resumes at the interrupt handler the wait ends with; the
        // following vector fetch pattern supplies it.
        self.regs.pc = None;
    }

    /// SWI/SWI2/SWI3: stack the entire state and vector.
    fn swi(&mut self, samples: &[Sample], mnemonic: Mnemonic, memory: &mut dyn MemoryAccess) {
        self.regs.cc.e = Some(true);

        let push_start = samples.iter().position(|s| s.rnw == Some(false));
        if let Some(start) = push_start {
            if samples.len() >= start + 12 {
                self.unstack_state(&samples[start..start + 12], true, memory);
            }
        }
        self.regs.s = self.regs.s.map(|s| s.wrapping_sub(12));

        if mnemonic == Mnemonic::Swi {
            self.regs.cc.i = Some(true);
            self.regs.cc.f = Some(true);
        }

        // The vector fetch is the last read pair before the trailing dead
        // cycle: [..., vector hi, vector lo, dead].
        let vector = match mnemonic {
            Mnemonic::Swi => Vector::Swi,
            Mnemonic::Swi2 => Vector::Swi2,
            _ => Vector::Swi3,
        };
        let hi = Self::from_end(samples, 3).map(|s| s.data);
        let lo = Self::from_end(samples, 2).map(|s| s.data);
        self.regs.pc = Self::word_at(hi, lo);
        if self.regs.pc.is_none() {
            self.regs.pc = Self::word_at(
                memory.read_raw(vector as u16),
                memory.read_raw(vector as u16 + 1),
            );
        }
    }

    /// The 6309 direct-bit group: one bit moves between CC/A/B and a
    /// direct-page byte.
    fn register_bit_op(
        &mut self,
        samples: &[Sample],
        inst: &Instruction,
        info: &OpcodeInfo,
        memory: &mut dyn MemoryAccess,
        _next_pc: Option<u16>,
    ) {
        use Mnemonic::*;

        let ea = self.regs.dp.map(|dp| word(dp, inst.operand8(info)));
        let src_bit = inst.postbyte >> 3 & 7;
        let dst_bit = inst.postbyte & 7;
        let is_store = info.mnemonic == Stbt;

        let mem_value = if is_store {
            self.read8(samples, 3, ea, AccessKind::Data, memory)
        } else {
            self.read8(samples, 2, ea, AccessKind::Data, memory)
        };

        let reg_value = match inst.postbyte >> 6 & 3 {
            0 => self.regs.cc.as_byte(),
            1 => self.regs.a,
            2 => self.regs.b,
            _ => None,
        };

        let mem_bit = mem_value.map(|v| bit(v, src_bit));
        let reg_bit = reg_value.map(|v| bit(v, dst_bit));

        let result_bit = match info.mnemonic {
            Band => zip_map(reg_bit, mem_bit, |a, b| a & b),
            Biand => zip_map(reg_bit, mem_bit.map(|b| !b), |a, b| a & b),
            Bor => zip_map(reg_bit, mem_bit, |a, b| a | b),
            Bior => zip_map(reg_bit, mem_bit.map(|b| !b), |a, b| a | b),
            Beor => zip_map(reg_bit, mem_bit, |a, b| a ^ b),
            Bieor => zip_map(reg_bit, mem_bit.map(|b| !b), |a, b| a ^ b),
            Ldbt => mem_bit,
            _ => None,
        };

        if is_store {
            // STBT writes the register bit into the memory byte.
            let store_bit = reg_value.map(|v| bit(v, src_bit));
            let predicted = zip_map(
                mem_value,
                zip_map(store_bit.map(|b| b as u8), Some(dst_bit), |b, d| b << d),
                |v, m| v & !(1 << dst_bit) | m,
            );
            self.store8(samples, 1, ea, predicted, memory);
            return;
        }

        let updated = zip_map(
            reg_value,
            result_bit.map(|b| b as u8),
            move |v, b| v & !(1 << dst_bit) | b << dst_bit,
        );
        match inst.postbyte >> 6 & 3 {
            0 => match updated {
                Some(cc) => self.regs.cc.set_all(cc),
                None => self.regs.cc = StatusRegister::UNKNOWN,
            },
            1 => self.regs.a = updated,
            2 => self.regs.b = updated,
            _ => {}
        }
    }
}
