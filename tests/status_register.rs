use m6809::status_register::StatusRegister;

/// Every branch predicate against every fully-known N/Z/V/C combination.
#[test]
fn status_register() {
    let mut sr = StatusRegister::UNKNOWN;

    for i in 0..0x10u8 {
        sr.set_all(i);
        let n = i & 0b1000 != 0;
        let z = i & 0b0100 != 0;
        let v = i & 0b0010 != 0;
        let c = i & 0b0001 != 0;

        assert_eq!(sr.condition(0), Some(true), "BRA for {}", i);
        assert_eq!(sr.condition(1), Some(false), "BRN for {}", i);
        assert_eq!(sr.condition(2), Some(!c && !z), "BHI for {}", i);
        assert_eq!(sr.condition(3), Some(c || z), "BLS for {}", i);
        assert_eq!(sr.condition(4), Some(!c), "BCC for {}", i);
        assert_eq!(sr.condition(5), Some(c), "BCS for {}", i);
        assert_eq!(sr.condition(6), Some(!z), "BNE for {}", i);
        assert_eq!(sr.condition(7), Some(z), "BEQ for {}", i);
        assert_eq!(sr.condition(8), Some(!v), "BVC for {}", i);
        assert_eq!(sr.condition(9), Some(v), "BVS for {}", i);
        assert_eq!(sr.condition(10), Some(!n), "BPL for {}", i);
        assert_eq!(sr.condition(11), Some(n), "BMI for {}", i);
        assert_eq!(sr.condition(12), Some(n == v), "BGE for {}", i);
        assert_eq!(sr.condition(13), Some(n != v), "BLT for {}", i);
        assert_eq!(sr.condition(14), Some(!z && n == v), "BGT for {}", i);
        assert_eq!(sr.condition(15), Some(z || n != v), "BLE for {}", i);
    }
}

/// Unknown flags make exactly the dependent predicates unknown.
#[test]
fn unknown_flags_propagate() {
    let mut sr = StatusRegister::UNKNOWN;
    sr.c = Some(false);

    // BRA/BRN never depend on flags.
    assert_eq!(sr.condition(0), Some(true));
    assert_eq!(sr.condition(1), Some(false));
    // BCC/BCS only need C.
    assert_eq!(sr.condition(4), Some(true));
    assert_eq!(sr.condition(5), Some(false));
    // BHI needs Z as well.
    assert_eq!(sr.condition(2), None);
    // BEQ needs Z.
    assert_eq!(sr.condition(7), None);
    // BGE needs N and V.
    assert_eq!(sr.condition(12), None);
}

#[test]
fn render_marks_unknown_bits() {
    let mut sr = StatusRegister::UNKNOWN;
    assert_eq!(sr.render(), "????????");
    sr.or_mask(0x50);
    assert_eq!(sr.render(), "?1?1????");
    sr.set_all(0xFF);
    assert_eq!(sr.render(), "11111111");
}
