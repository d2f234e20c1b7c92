//! End-to-end scenarios: synthetic traces through the driver, plus
//! emulator-level taint behaviour.

use m6809::driver::{Config, Driver};
use m6809::cpu_details::{CycleCount, count_cycles};
use m6809::instruction::Instruction;
use m6809::memory_access::{MemoryAccess, TraceMemory};
use m6809::sample::{Sample, SliceSource};
use m6809::{CpuType, M6809, Registers};

/// An instruction or dead read cycle.
fn read(data: u8) -> Sample {
    Sample {
        data,
        rnw: Some(true),
        lic: Some(false),
        bs: Some(false),
        ..Sample::default()
    }
}

fn write(data: u8) -> Sample {
    Sample { rnw: Some(false), ..read(data) }
}

fn dead() -> Sample {
    read(0xFF)
}

/// Marks the final cycle of an instruction.
fn last(mut sample: Sample) -> Sample {
    sample.lic = Some(true);
    sample
}

fn seq(mut samples: Vec<Sample>) -> Vec<Sample> {
    for (i, sample) in samples.iter_mut().enumerate() {
        sample.seq = i as u32;
    }
    samples
}

fn run_driver(
    samples: Vec<Sample>,
    cpu: CpuType,
    seed: impl FnOnce(&mut M6809),
) -> (Vec<String>, Driver<TraceMemory>) {
    let samples = seq(samples);
    let mut source = SliceSource::new(&samples);
    let config = Config { cpu, show_cycles: true, ..Config::default() };
    let mut driver = Driver::new(config, TraceMemory::new());
    seed(driver.cpu_mut());
    let mut lines = Vec::new();
    driver.run(&mut source, &mut |line| lines.push(line.to_string()));
    (lines, driver)
}

#[test]
fn lda_immediate() {
    let trace = vec![read(0x86), last(read(0x42))];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
    });

    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("LDA   #$42"), "{}", lines[0]);
    assert!(lines[0].contains("1000"), "{}", lines[0]);

    let regs = &driver.cpu_mut().regs;
    assert_eq!(regs.a, Some(0x42));
    assert_eq!(regs.cc.n, Some(false));
    assert_eq!(regs.cc.z, Some(false));
    assert_eq!(regs.cc.v, Some(false));
    assert_eq!(regs.pc, Some(0x1002));
}

#[test]
fn ldy_immediate16() {
    let trace = vec![read(0x10), read(0x8E), read(0x12), last(read(0x34))];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
    });

    assert!(lines[0].contains("LDY   #$1234"), "{}", lines[0]);
    assert_eq!(driver.cpu_mut().regs.y, Some(0x1234));
}

#[test]
fn lda_indexed_zero_offset() {
    // LDA ,X with X=$2000 and $7F on the bus during the data cycle.
    let trace = vec![read(0xA6), read(0x84), dead(), last(read(0x7F))];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.x = Some(0x2000);
    });

    assert!(lines[0].contains("LDA   ,X"), "{}", lines[0]);
    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.a, Some(0x7F));
    assert_eq!(cpu.regs.cc.n, Some(false));
    assert_eq!(cpu.regs.cc.z, Some(false));
}

#[test]
fn ldd_pcr_offset() {
    // LDD $0004,PCR at $1000: effective address $1000+4+4 = $1008.
    let trace = vec![
        read(0xEC), read(0x8D), read(0x00), read(0x04),
        dead(), dead(), dead(), dead(),
        read(0x12), last(read(0x34)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
    });

    assert!(lines[0].contains("LDD   $0004,PCR"), "{}", lines[0]);
    assert_eq!(driver.cpu_mut().regs.d(), Some(0x1234));
}

#[test]
fn pshs_b_a() {
    // PSHS B,A: five internal cycles then B and A hit the bus.
    let trace = vec![
        read(0x34), read(0x06), dead(), dead(), dead(),
        write(0x22), last(write(0x11)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.a = Some(0x11);
        cpu.regs.b = Some(0x22);
        cpu.regs.s = Some(0x8000);
    });

    assert!(lines[0].contains("PSHS  B,A"), "{}", lines[0]);
    assert!(!lines[0].contains("FAIL"), "{}", lines[0]);
    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.s, Some(0x7FFE));
    assert_eq!(cpu.fail_count(), 0);
}

#[test]
fn pshs_checks_written_data() {
    // The bus says B was $99; the emulator thought $22.
    let trace = vec![
        read(0x34), read(0x06), dead(), dead(), dead(),
        write(0x99), last(write(0x11)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.a = Some(0x11);
        cpu.regs.b = Some(0x22);
        cpu.regs.s = Some(0x8000);
    });

    assert!(lines[0].contains("FAIL"), "{}", lines[0]);
    // The captured byte is authoritative.
    assert_eq!(driver.cpu_mut().regs.b, Some(0x99));
}

#[test]
fn ldq_immediate32() {
    let trace = vec![
        read(0xCD), read(0x00), read(0x10), read(0x20), last(read(0x30)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6309, |cpu| {
        cpu.regs.pc = Some(0x1000);
    });

    assert!(lines[0].contains("LDQ   #$00102030"), "{}", lines[0]);
    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.d(), Some(0x0010));
    assert_eq!(cpu.regs.w(), Some(0x2030));
}

#[test]
fn reset_recognition() {
    // Two BS-tagged reads from $FFFE/$FFFF load PC regardless of prior state.
    let vector = |data: u8, lsb: bool| Sample {
        data,
        rnw: Some(true),
        bs: Some(true),
        addr_lsb: Some(lsb),
        lic: Some(false),
        ..Sample::default()
    };
    let trace = vec![
        dead(), dead(),
        vector(0x12, false), vector(0x34, true),
        read(0x86), last(read(0x55)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0xDEAD);
        cpu.regs.a = Some(0x77);
    });

    assert!(lines[0].contains("RESET"), "{}", lines[0]);
    assert!(lines[1].contains("LDA   #$55"), "{}", lines[1]);

    let cpu = driver.cpu_mut();
    // Reset wiped the stale state, then LDA executed from $1234.
    assert_eq!(cpu.regs.pc, Some(0x1236));
    assert_eq!(cpu.regs.a, Some(0x55));
    assert_eq!(cpu.regs.cc.i, Some(true));
    assert_eq!(cpu.regs.cc.f, Some(true));
    assert_eq!(cpu.regs.x, None);
}

#[test]
fn illegal_opcode_consumes_one_sample() {
    let trace = vec![last(read(0x38)), read(0x86), last(read(0x42))];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
    });

    assert!(lines[0].contains("???"), "{}", lines[0]);
    assert!(lines[1].contains("LDA   #$42"), "{}", lines[1]);
    assert_eq!(driver.cpu_mut().regs.a, Some(0x42));
}

#[test]
fn taint_is_idempotent() {
    let mut cpu = M6809::new(CpuType::Cpu6809);
    let mut memory = TraceMemory::new();

    let run = |cpu: &mut M6809, memory: &mut TraceMemory, bytes: &[u8]| {
        let samples: Vec<Sample> = bytes.iter().map(|&b| read(b)).collect();
        let (inst, info) = Instruction::decode(bytes, cpu.regs.pc, CpuType::Cpu6809);
        cpu.emulate(&samples, &inst, &info, memory);
    };

    // Unknown + known = unknown.
    run(&mut cpu, &mut memory, &[0x8B, 0x01]); // ADDA #$01
    assert_eq!(cpu.regs.a, None);
    assert_eq!(cpu.regs.cc.z, None);

    // A full-width load of a known value clears the taint.
    run(&mut cpu, &mut memory, &[0x86, 0x42]); // LDA #$42
    assert_eq!(cpu.regs.a, Some(0x42));

    // Known + known = known, flags included.
    run(&mut cpu, &mut memory, &[0x8B, 0x01]); // ADDA #$01
    assert_eq!(cpu.regs.a, Some(0x43));
    assert_eq!(cpu.regs.cc.z, Some(false));
    assert_eq!(cpu.regs.cc.n, Some(false));
    assert_eq!(cpu.regs.cc.c, Some(false));

    // An unknown operand taints the result again.
    cpu.regs.b = None;
    run(&mut cpu, &mut memory, &[0x1F, 0x98]); // TFR B,A
    assert_eq!(cpu.regs.a, None);
}

#[test]
fn trace_memory_learns_from_reads() {
    let trace = vec![read(0xA6), read(0x84), dead(), last(read(0x7F))];
    let (_, driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.x = Some(0x2000);
    });

    // The witnessed data cycle taught the model what $2000 holds.
    assert_eq!(driver.memory().read_raw(0x2000), Some(0x7F));
    assert_eq!(driver.memory().read_raw(0x2001), None);
}

/// Spec property: a synthetic LIC-tagged trace yields identical boundaries
/// when LIC is masked off and the counts are computed from the tables.
#[test]
fn computed_boundaries_match_lic() {
    let mut regs = Registers::UNKNOWN;
    regs.cc.z = Some(true);

    // A program covering immediate, direct, extended, indexed, push and
    // taken long-branch forms.
    let program: Vec<Vec<Sample>> = vec![
        vec![read(0x86), read(0x42)],                                            // LDA #$42
        vec![read(0x96), read(0x80), dead(), read(0x12)],                        // LDA $80
        vec![read(0xB7), read(0x20), read(0x00), dead(), write(0x12)],           // STA $2000
        vec![read(0x34), read(0x06), dead(), dead(), dead(), write(0), write(0)],// PSHS B,A
        vec![read(0x8E), read(0x20), read(0x00)],                                // LDX #$2000
        vec![read(0x20), read(0x10), dead()],                                    // BRA
        vec![
            read(0xEC), read(0x8D), read(0x00), read(0x04),
            dead(), dead(), dead(), dead(), read(0), read(0),
        ],                                                                       // LDD $0004,PCR
        vec![read(0x10), read(0x27), read(0x00), read(0x10), dead(), dead()],    // LBEQ taken
    ];

    for instruction in program {
        let mut with_lic = instruction.clone();
        let n = with_lic.len();
        with_lic[n - 1].lic = Some(true);
        // Pad the window with the next opcode so look-ahead has data.
        with_lic.push(read(0x12));
        with_lic[n].lic = Some(false);

        let exact = count_cycles(&with_lic, false, CpuType::Cpu6809, &regs).unwrap();
        assert_eq!(exact, CycleCount::Lic(n), "LIC boundary for {:02X}", instruction[0].data);

        let masked: Vec<Sample> = with_lic
            .iter()
            .map(|s| Sample { lic: None, ..*s })
            .collect();
        let computed = count_cycles(&masked, false, CpuType::Cpu6809, &regs).unwrap();
        assert_eq!(
            computed,
            CycleCount::Computed(n),
            "computed boundary for {:02X}",
            instruction[0].data
        );
    }
}

#[test]
fn bsr_with_known_pc() {
    // BSR $1012: three internal cycles then the return address is pushed
    // low byte first.
    let trace = vec![
        read(0x8D), read(0x10), dead(), dead(), dead(),
        write(0x02), last(write(0x10)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.s = Some(0x8000);
    });

    assert!(lines[0].contains("BSR   $1012"), "{}", lines[0]);
    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.pc, Some(0x1012));
    assert_eq!(cpu.regs.s, Some(0x7FFE));
    assert_eq!(cpu.fail_count(), 0);
}

#[test]
fn bsr_recovers_unknown_pc() {
    // Mid-stream capture: PC is unknown going in, but the stacked return
    // address $1002 reveals it, so the branch target resolves.
    let trace = vec![
        read(0x8D), read(0x10), dead(), dead(), dead(),
        write(0x02), last(write(0x10)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.s = Some(0x8000);
    });

    assert!(lines[0].contains("BSR   pc+16"), "{}", lines[0]);
    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.pc, Some(0x1012));
    assert_eq!(cpu.regs.s, Some(0x7FFE));
    assert_eq!(cpu.fail_count(), 0);
}

#[test]
fn lbsr_pushes_and_branches() {
    let trace = vec![
        read(0x17), read(0x01), read(0x00), dead(), dead(), dead(), dead(),
        write(0x03), last(write(0x10)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.s = Some(0x8000);
    });

    assert!(lines[0].contains("LBSR  $1103"), "{}", lines[0]);
    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.pc, Some(0x1103));
    assert_eq!(cpu.regs.s, Some(0x7FFE));
}

#[test]
fn jsr_indexed() {
    // JSR ,X with X=$2000: the target comes from the index register, the
    // return address $1002 is checked against the pushed bytes.
    let trace = vec![
        read(0xAD), read(0x84), dead(), dead(), dead(),
        write(0x02), last(write(0x10)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.x = Some(0x2000);
        cpu.regs.s = Some(0x8000);
    });

    assert!(lines[0].contains("JSR   ,X"), "{}", lines[0]);
    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.pc, Some(0x2000));
    assert_eq!(cpu.regs.s, Some(0x7FFE));
    assert_eq!(cpu.fail_count(), 0);
}

#[test]
fn rts_pulls_return_address() {
    let trace = vec![
        read(0x39), dead(), read(0x12), read(0x34), last(dead()),
    ];
    let (_, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x2000);
        cpu.regs.s = Some(0x7FFE);
    });

    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.pc, Some(0x1234));
    assert_eq!(cpu.regs.s, Some(0x8000));
}

#[test]
fn rti_short_form() {
    // Stacked CC has E clear, so only CC and PC come off the stack.
    let trace = vec![
        read(0x3B), dead(), read(0x00), read(0x12), read(0x34), last(dead()),
    ];
    let (_, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x2000);
        cpu.regs.s = Some(0x7FFD);
    });

    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.pc, Some(0x1234));
    assert_eq!(cpu.regs.s, Some(0x8000));
    assert_eq!(cpu.regs.cc.e, Some(false));
    assert_eq!(cpu.regs.cc.i, Some(false));
}

#[test]
fn swi_stacks_state_and_vectors() {
    // SWI stacks the entire state; the pushed bytes reveal every register
    // the capture started without.
    let mut trace = vec![read(0x3F), dead(), dead()];
    for data in [0x01, 0x10, 0x44, 0x44, 0x33, 0x33, 0x22, 0x22, 0x00, 0x22, 0x11, 0x80] {
        trace.push(write(data));
    }
    trace.push(dead());
    trace.extend([read(0xE0), read(0x10)]);
    trace.push(last(dead()));

    let (_, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.s = Some(0x8000);
    });

    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.pc, Some(0xE010));
    assert_eq!(cpu.regs.s, Some(0x7FF4));
    assert_eq!(cpu.regs.u, Some(0x4444));
    assert_eq!(cpu.regs.y, Some(0x3333));
    assert_eq!(cpu.regs.x, Some(0x2222));
    assert_eq!(cpu.regs.dp, Some(0x00));
    assert_eq!(cpu.regs.b, Some(0x22));
    assert_eq!(cpu.regs.a, Some(0x11));
    assert_eq!(cpu.regs.cc.e, Some(true));
    assert_eq!(cpu.regs.cc.i, Some(true));
    assert_eq!(cpu.regs.cc.f, Some(true));
    assert_eq!(cpu.fail_count(), 0);
}

#[test]
fn daa_adjusts_after_add() {
    // ADDA #$25 with A=$48 leaves $6D; DAA corrects the low digit to $73.
    let trace = vec![
        read(0x8B), last(read(0x25)),
        read(0x19), last(dead()),
    ];
    let (_, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.a = Some(0x48);
    });

    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.a, Some(0x73));
    assert_eq!(cpu.regs.cc.c, Some(false));
    assert_eq!(cpu.regs.cc.n, Some(false));
    assert_eq!(cpu.regs.cc.z, Some(false));
}

#[test]
fn divd_immediate() {
    // DIVD #$07 with D=100: quotient 14 to B, remainder 2 to A.
    let mut trace = vec![read(0x11), read(0x8D), read(0x07)];
    trace.extend(std::iter::repeat_n(dead(), 21));
    trace.push(last(dead()));

    let (_, mut driver) = run_driver(trace, CpuType::Cpu6309, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.a = Some(0x00);
        cpu.regs.b = Some(0x64);
    });

    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.b, Some(14));
    assert_eq!(cpu.regs.a, Some(2));
    assert_eq!(cpu.regs.cc.n, Some(false));
    assert_eq!(cpu.regs.cc.z, Some(false));
    assert_eq!(cpu.regs.cc.v, Some(false));
    assert_eq!(cpu.regs.cc.c, Some(false));
}

#[test]
fn tfm_computed_boundary() {
    // TFM X+,Y+ with W=3, decoded without LIC: the boundary comes from the
    // 6 + 3n rule and the pointers advance three bytes.
    let mut trace = vec![read(0x11), read(0x38), read(0x12)];
    trace.extend(std::iter::repeat_n(dead(), 12));
    for sample in trace.iter_mut() {
        sample.lic = None;
    }

    let (_, mut driver) = run_driver(trace, CpuType::Cpu6309, |cpu| {
        cpu.regs.pc = Some(0x1000);
        cpu.regs.e = Some(0x00);
        cpu.regs.f = Some(0x03);
        cpu.regs.x = Some(0x2000);
        cpu.regs.y = Some(0x3000);
    });

    let cpu = driver.cpu_mut();
    assert_eq!(cpu.regs.x, Some(0x2003));
    assert_eq!(cpu.regs.y, Some(0x3003));
    assert_eq!(cpu.regs.w(), Some(0));
    assert_eq!(cpu.regs.cc.z, Some(true));
}

#[test]
fn store_reveals_unknown_register() {
    // STA $2000 with A unknown: the captured write teaches the emulator A.
    let trace = vec![
        read(0xB7), read(0x20), read(0x00), dead(), last(write(0x5A)),
    ];
    let (lines, mut driver) = run_driver(trace, CpuType::Cpu6809, |cpu| {
        cpu.regs.pc = Some(0x1000);
    });

    assert!(lines[0].contains("STA   $2000"), "{}", lines[0]);
    assert!(!lines[0].contains("FAIL"), "{}", lines[0]);
    assert_eq!(driver.cpu_mut().regs.a, Some(0x5A));
}
