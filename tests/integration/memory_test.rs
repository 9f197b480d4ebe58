use aigsym::config::EngineConfig;
use aigsym::{Endian, MachineState, Vector};
use std::cell::Cell;

fn machine() -> MachineState {
    MachineState::create("memory", 0x1000, 64, 0x8000, 32)
}

fn value(ms: &mut MachineState, n: usize, seed: u64) -> Vector {
    let bits = n * 8;
    let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    ms.constant(bits, 0x0123_4567_89ab_cdef_u64.rotate_left(seed as u32) & mask)
}

#[test]
fn test_concrete_round_trip_all_sizes_and_orders() {
    let mut ms = machine();
    for n in [1usize, 2, 4, 8] {
        for endian in [Endian::Little, Endian::Big] {
            let v = value(&mut ms, n, n as u64);
            ms.store_concrete(0x1008, &v, endian);
            let back = ms.load_concrete(0x1008, n, endian);
            assert_eq!(back.as_u64(), v.as_u64(), "{} bytes {}", n, endian);
            ms.release(back);
            ms.release(v);
        }
    }
    assert_eq!(ms.diagnostics().read_before_write_count(), 0);
    assert!(ms.destroy().0.is_clean());
}

#[test]
fn test_symbolic_round_trip_all_sizes_and_orders() {
    let mut ms = machine();
    let addr = ms.new_symbolic("addr", 32);
    for n in [1usize, 2, 4, 8] {
        for endian in [Endian::Little, Endian::Big] {
            let v = ms.new_symbolic(&format!("v{}{}", n, endian), n * 8);
            ms.store_symbolic(&addr, &v, endian);
            let back = ms.load_symbolic(&addr, n, endian);
            let same = ms.equal(&back, &v);
            assert!(
                ms.context_mut().circuit.is_provably_constant(same, true),
                "{} bytes {}",
                n,
                endian
            );
            ms.release(back);
            ms.release(v);
        }
    }
    ms.release(addr);
    assert!(ms.destroy().0.is_clean());
}

#[test]
fn test_byte_order_layout_matches_between_memories() {
    let mut ms = machine();
    let v = ms.constant(32, 0xdead_beef);
    let base = ms.constant(32, 0x40);
    ms.store_concrete_be(0x1000, &v);
    ms.store_symbolic_be(&base, &v);
    for i in 0..4u64 {
        let c = ms.load_concrete_le(0x1000 + i, 1);
        let offset = ms.constant(32, i);
        let addr = ms.add(&base, &offset);
        let s = ms.load_symbolic_le(&addr, 1);
        assert_eq!(c.as_u64(), s.as_u64());
        assert_eq!(c.as_u64(), Some((0xdead_beef_u64 >> (8 * (3 - i))) & 0xff));
        for x in [c, offset, addr, s] {
            ms.release(x);
        }
    }
}

#[test]
fn test_read_before_write_one_diagnostic_per_byte() {
    let mut ms = machine();
    let v = ms.load_concrete_le(0x1010, 4);
    assert_eq!(v.as_u64(), Some(0));
    assert_eq!(ms.diagnostics().read_before_write_count(), 4);

    let addr = ms.constant(32, 0x500);
    let s = ms.load_symbolic_le(&addr, 2);
    assert_eq!(s.as_u64(), Some(0));
    assert_eq!(ms.diagnostics().read_before_write_count(), 6);
}

#[test]
fn test_partially_written_read_reports_only_missing_bytes() {
    let mut ms = machine();
    let byte = ms.constant(8, 0x7f);
    ms.store_concrete_le(0x1001, &byte);
    let v = ms.load_concrete_le(0x1000, 2);
    assert_eq!(v.as_u64(), Some(0x7f00));
    assert_eq!(ms.diagnostics().read_before_write_count(), 1);
}

#[test]
fn test_ite_merge_of_memories() {
    let mut ms = machine();
    let addr = ms.constant(32, 0x200);
    let c = ms.context_mut().circuit.new_input("c");
    ms.conditional(
        c,
        &mut |ms| {
            let v = ms.constant(16, 0x1111);
            ms.store_concrete_le(0x1000, &v);
            let addr = ms.constant(32, 0x200);
            ms.store_symbolic_le(&addr, &v);
            ms.release(addr);
            ms.release(v);
        },
        &mut |_| {},
        &mut |ms| {
            let v = ms.constant(16, 0x2222);
            ms.store_concrete_le(0x1000, &v);
            let addr = ms.constant(32, 0x200);
            ms.store_symbolic_le(&addr, &v);
            ms.release(addr);
            ms.release(v);
        },
        &mut |_| {},
        false,
    );
    let conc = ms.load_concrete_le(0x1000, 2);
    let sym = ms.load_symbolic_le(&addr, 2);
    for (c_value, expected) in [(true, 0x1111u128), (false, 0x2222)] {
        assert_eq!(ms.evaluate(&conc, &[c_value]), expected);
        assert_eq!(ms.evaluate(&sym, &[c_value]), expected);
    }
    for v in [conc, sym, addr] {
        ms.release(v);
    }
    let (leaks, diagnostics) = ms.destroy();
    assert!(leaks.is_clean());
    assert_eq!(diagnostics.read_before_write_count(), 0);
}

#[test]
fn test_arrays_round_trip() {
    let mut ms = machine();
    let values: Vec<Vector> = (0..4).map(|i| ms.constant(16, 0x100 * i + 7)).collect();
    ms.store_concrete_array(0x1020, &values, Endian::Big);
    let back = ms.load_concrete_array(0x1020, 4, 2, Endian::Big);
    let base = ms.constant(32, 0x9000);
    ms.store_symbolic_array_le(&base, &values);
    let sym = ms.load_symbolic_array_le(&base, 4, 2);
    for ((v, b), s) in values.iter().zip(&back).zip(&sym) {
        assert_eq!(v.as_u64(), b.as_u64());
        assert_eq!(v.as_u64(), s.as_u64());
    }
    for v in values.into_iter().chain(back).chain(sym) {
        ms.release(v);
    }
    ms.release(base);
    assert!(ms.destroy().0.is_clean());
}

/// Store 0x11 at 0x40, then 0x22 at a symbolic address `q`, and branch on
/// `q == 0x40`. Returns what each side read back from 0x40.
fn read_back_under_alias(sat_loads: bool) -> (Option<u64>, Option<u64>) {
    let config = EngineConfig::default().with_sat_strengthened_loads(sat_loads);
    let mut ms = MachineState::with_config("alias", 0, 0, 0x8000, 32, config).unwrap();
    let q = ms.new_symbolic("q", 32);
    let fixed = ms.constant(32, 0x40);
    ms.store_symbolic_int(&fixed, 0x11, 1, Endian::Little);
    ms.store_symbolic_int(&q, 0x22, 1, Endian::Little);
    let aliased = ms.equal(&q, &fixed);

    let on_true = Cell::new(None);
    let on_false = Cell::new(None);
    let read = |ms: &mut MachineState, into: &Cell<Option<u64>>| {
        let addr = ms.constant(32, 0x40);
        let v = ms.load_symbolic_le(&addr, 1);
        into.set(v.as_u64());
        ms.release(v);
        ms.release(addr);
    };
    ms.conditional(
        aliased,
        &mut |ms| read(ms, &on_true),
        &mut |_| {},
        &mut |ms| read(ms, &on_false),
        &mut |_| {},
        false,
    );
    assert!(!ms.branch_error());
    (on_true.get(), on_false.get())
}

#[test]
fn test_sat_strengthened_loads_resolve_aliasing_under_path_condition() {
    assert_eq!(read_back_under_alias(true), (Some(0x22), Some(0x11)));
}

#[test]
fn test_plain_loads_keep_aliasing_symbolic() {
    assert_eq!(read_back_under_alias(false), (None, None));
}
