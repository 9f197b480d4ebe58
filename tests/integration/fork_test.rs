use aigsym::config::EngineConfig;
use aigsym::{BranchState, Diagnostic, MachineState};

const SLOT: u64 = 0x10;

fn machine() -> MachineState {
    MachineState::create("fork", 0, 32, 0x100, 16)
}

fn byte_bits(v: u64) -> Vec<bool> {
    (0..8).map(|i| (v >> i) & 1 == 1).collect()
}

#[test]
fn test_fork_merge_matches_explicit_ite() {
    let mut ms = machine();
    let x = ms.new_symbolic("x", 8);
    ms.store_concrete_le(SLOT, &x);
    let ten = ms.constant(8, 10);
    let c = ms.ult(&x, &ten);
    ms.release(ten);

    let state = ms.conditional(
        c,
        &mut |ms| {
            let x = ms.load_concrete_le(SLOT, 1);
            let one = ms.constant(8, 1);
            let y = ms.add(&x, &one);
            ms.store_concrete_le(SLOT, &y);
            for v in [x, one, y] {
                ms.release(v);
            }
        },
        &mut |_| {},
        &mut |ms| {
            let x = ms.load_concrete_le(SLOT, 1);
            let y = ms.add(&x, &x);
            ms.store_concrete_le(SLOT, &y);
            ms.release(x);
            ms.release(y);
        },
        &mut |_| {},
        true,
    );
    assert_eq!(state, BranchState::Forked);
    assert_eq!(ms.fork_depth(), 0);

    let merged = ms.load_concrete_le(SLOT, 1);
    let ten = ms.constant(8, 10);
    let c = ms.ult(&x, &ten);
    let one = ms.constant(8, 1);
    let t = ms.add(&x, &one);
    let f = ms.add(&x, &x);
    let expected = ms.ite(c, &t, &f);
    let same = ms.equal(&merged, &expected);
    assert!(ms.context_mut().circuit.is_provably_constant(same, true));

    for v in [0u64, 9, 10, 200] {
        let want = if v < 10 { v + 1 } else { (2 * v) & 0xff };
        assert_eq!(ms.evaluate(&merged, &byte_bits(v)), want as u128);
    }
    for v in [merged, ten, one, t, f, expected, x] {
        ms.release(v);
    }
    let (leaks, diagnostics) = ms.destroy();
    assert!(leaks.is_clean(), "{:?}", leaks);
    assert!(diagnostics.events().is_empty());
}

#[test]
fn test_sat_folding_of_implied_condition() {
    let mut ms = machine();
    let x = ms.new_symbolic("x", 8);
    ms.store_concrete_le(SLOT, &x);
    ms.release(x);
    let mut inner = None;

    let x = ms.load_concrete_le(SLOT, 1);
    let ten = ms.constant(8, 10);
    let small = ms.ult(&x, &ten);
    for v in [x, ten] {
        ms.release(v);
    }
    ms.conditional(
        small,
        &mut |ms| {
            let x = ms.load_concrete_le(SLOT, 1);
            let twenty = ms.constant(8, 20);
            let c = ms.ult(&x, &twenty);
            ms.release(twenty);
            ms.release(x);
            inner = Some(ms.conditional(c, &mut |_| {}, &mut |_| {}, &mut |_| {}, &mut |_| {}, true));
        },
        &mut |_| {},
        &mut |_| {},
        &mut |_| {},
        true,
    );
    assert_eq!(inner, Some(BranchState::FoldedTrue));
    assert!(ms.destroy().0.is_clean());
}

#[test]
fn test_aborted_side_is_dropped_from_merge() {
    let mut ms = machine();
    let c = ms.context_mut().circuit.new_input("c");
    let mut reachable = None;
    let state = ms.conditional(
        c,
        &mut |ms| {
            let v = ms.constant(8, 0xaa);
            ms.store_concrete_le(SLOT, &v);
            ms.release(v);
            reachable = ms.abort_path();
        },
        &mut |_| {},
        &mut |ms| {
            let v = ms.constant(8, 0x55);
            ms.store_concrete_le(SLOT, &v);
            ms.release(v);
        },
        &mut |_| {},
        false,
    );
    assert_eq!(state, BranchState::Forked);
    assert!(!ms.branch_error());
    assert_eq!(reachable, Some(vec![("c".to_string(), true)]));
    let v = ms.load_concrete_le(SLOT, 1);
    assert_eq!(v.as_u64(), Some(0x55));
    ms.release(v);
    assert!(ms.destroy().0.is_clean());
}

#[test]
fn test_fork_budget_limits_nesting() {
    let config = EngineConfig::default().with_fork_depth(1);
    let mut ms = MachineState::with_config("budget", 0, 8, 0, 16, config).unwrap();
    let a = ms.context_mut().circuit.new_input("a");
    let b = ms.context_mut().circuit.new_input("b");
    let mut inner = None;
    let outer = ms.conditional(
        a,
        &mut |ms| {
            inner = Some(ms.conditional(b, &mut |_| {}, &mut |_| {}, &mut |_| {}, &mut |_| {}, false));
            ms.clear_branch_error();
        },
        &mut |_| {},
        &mut |_| {},
        &mut |_| {},
        false,
    );
    assert_eq!(inner, Some(BranchState::Errored));
    assert_eq!(outer, BranchState::Forked);
    let events = ms.diagnostics().events().to_vec();
    assert_eq!(events, vec![Diagnostic::ForkBudgetExhausted { depth: 1 }]);
    assert!(ms.destroy().0.is_clean());
}
