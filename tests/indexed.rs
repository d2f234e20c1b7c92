use m6809::CpuType;
use m6809::addressing_modes::{IndexedKind, decode_postbyte};

/// Independent reference for the operand-byte count of a post-byte.
fn expected_bytes(pb: u8, cpu: CpuType) -> u8 {
    if pb & 0x80 == 0 {
        return 0;
    }
    if cpu.is_6309() && (pb & 0x1F == 0x0F || pb & 0x1F == 0x10) {
        return if pb >> 5 & 3 == 1 { 2 } else { 0 };
    }
    match pb & 0x0F {
        0x8 | 0xC => 1,
        0x9 | 0xD | 0xF => 2,
        _ => 0,
    }
}

/// Independent reference for legality.
fn expected_legal(pb: u8, cpu: CpuType) -> bool {
    if pb & 0x80 == 0 {
        return true;
    }
    if cpu.is_6309() && (pb & 0x1F == 0x0F || pb & 0x1F == 0x10) {
        // The ,W family is always defined on a 6309.
        return true;
    }
    match pb & 0x0F {
        0x7 | 0xA | 0xE => cpu.is_6309(),
        _ => true,
    }
}

/// Every post-byte, both CPU variants: byte count, indirection and
/// legality all line up, and the extra cycle count is consistent with the
/// +3 indirection premium.
#[test]
fn postbyte_exhaustive() {
    for cpu in [CpuType::Cpu6809, CpuType::Cpu6309] {
        for pb in 0..=255u8 {
            let entry = decode_postbyte(pb, cpu);

            assert_eq!(
                entry.extra_bytes,
                expected_bytes(pb, cpu),
                "operand bytes for pb={:02X} on {:?}",
                pb,
                cpu
            );

            if pb & 0x80 == 0 {
                assert_eq!(entry.kind, IndexedKind::Offset5(((pb as i8) << 3) >> 3));
                assert!(!entry.indirect, "5-bits offsets are never indirect");
                assert_eq!(entry.extra_cycles, 1);
                assert!(entry.is_legal(cpu));
            } else {
                let w_slot = cpu.is_6309() && (pb & 0x1F == 0x0F || pb & 0x1F == 0x10);
                if !w_slot {
                    assert_eq!(entry.indirect, pb & 0x10 != 0, "indirection for pb={:02X}", pb);
                }

                // Indirection always costs three more than the direct form.
                if pb & 0x10 != 0 && !w_slot {
                    let direct = decode_postbyte(pb & !0x10, cpu);
                    if direct.kind == entry.kind {
                        assert_eq!(
                            entry.extra_cycles,
                            direct.extra_cycles + 3,
                            "indirect premium for pb={:02X}",
                            pb
                        );
                    }
                }

                assert_eq!(
                    entry.is_legal(cpu),
                    expected_legal(pb, cpu),
                    "legality for pb={:02X} on {:?}",
                    pb,
                    cpu
                );
            }
        }
    }
}

/// The published sub-mode table, spot-checked entry by entry.
#[test]
fn postbyte_submodes() {
    use IndexedKind::*;

    let cases: &[(u8, IndexedKind, u8, u8, bool)] = &[
        // pb, kind, extra bytes, extra cycles, indirect
        (0x84, ZeroOffset, 0, 0, false),
        (0x80, PostInc1, 0, 2, false),
        (0x81, PostInc2, 0, 3, false),
        (0x82, PreDec1, 0, 2, false),
        (0x83, PreDec2, 0, 3, false),
        (0x85, AccB, 0, 1, false),
        (0x86, AccA, 0, 1, false),
        (0x88, Offset8, 1, 1, false),
        (0x89, Offset16, 2, 4, false),
        (0x8B, AccD, 0, 4, false),
        (0x8C, PcOffset8, 1, 1, false),
        (0x8D, PcOffset16, 2, 5, false),
        (0x91, PostInc2, 0, 6, true),
        (0x94, ZeroOffset, 0, 3, true),
        (0x98, Offset8, 1, 4, true),
        (0x99, Offset16, 2, 7, true),
        (0x9F, ExtendedIndirect, 2, 5, true),
    ];

    for &(pb, kind, bytes, cycles, indirect) in cases {
        let entry = decode_postbyte(pb, CpuType::Cpu6809);
        assert_eq!(entry.kind, kind, "kind for pb={:02X}", pb);
        assert_eq!(entry.extra_bytes, bytes, "bytes for pb={:02X}", pb);
        assert_eq!(entry.extra_cycles, cycles, "cycles for pb={:02X}", pb);
        assert_eq!(entry.indirect, indirect, "indirect for pb={:02X}", pb);
    }
}

/// The 6309 W family shadows the `0x0F`/`0x10` slots.
#[test]
fn postbyte_w_family() {
    use IndexedKind::*;

    for (pb, kind, bytes, indirect) in [
        (0x8Fu8, WZero, 0u8, false),
        (0xAF, WOffset16, 2, false),
        (0xCF, WPostInc2, 0, false),
        (0xEF, WPreDec2, 0, false),
        (0x90, WZero, 0, true),
        (0xB0, WOffset16, 2, true),
        (0xD0, WPostInc2, 0, true),
        (0xF0, WPreDec2, 0, true),
    ] {
        let entry = decode_postbyte(pb, CpuType::Cpu6309);
        assert_eq!(entry.kind, kind, "kind for pb={:02X}", pb);
        assert_eq!(entry.extra_bytes, bytes, "bytes for pb={:02X}", pb);
        assert_eq!(entry.indirect, indirect, "indirect for pb={:02X}", pb);
        assert!(entry.is_legal(CpuType::Cpu6309));

        // On a 6809 the same byte decodes through the main table.
        let entry = decode_postbyte(pb, CpuType::Cpu6809);
        assert!(!matches!(
            entry.kind,
            WZero | WOffset16 | WPostInc2 | WPreDec2
        ));
    }
}
