use aigsym::validation::{check, check_width, equivalence::operands_for, CheckConfig, Op, RandomOperandConfig};

#[test]
fn test_all_widths_agree() {
    let config = CheckConfig {
        operands: RandomOperandConfig { count: 12, seed: 0x1234 },
        ..CheckConfig::default()
    };
    assert_eq!(config.widths, vec![1, 8, 32, 64, 128]);
    let report = check(&config);
    assert!(report.passed(), "first mismatch: {:?}", report.mismatches.first());
    assert!(report.checks >= Op::ALL.len() * config.widths.len());
}

#[test]
fn test_odd_widths_agree() {
    for width in [3usize, 13, 65] {
        let operands = operands_for(width, &RandomOperandConfig { count: 8, seed: 9 });
        let report = check_width(width, &operands);
        assert!(report.passed(), "width {}: {:?}", width, report.mismatches.first());
    }
}

#[test]
fn test_division_by_zero_conventions() {
    for width in [8usize, 64] {
        let operands = [(0u128, 0u128), (5, 0), ((1u128 << width) - 1, 0)];
        let report = check_width(width, &operands);
        assert!(report.passed(), "{:?}", report.mismatches.first());
    }
    assert_eq!(Op::Div.reference(5, 0, 8), 0xff);
    assert_eq!(Op::Rem.reference(5, 0, 8), 5);
    assert_eq!(Op::Sdiv.reference(5, 0, 8), 0);
    assert_eq!(Op::Srem.reference(0xfb, 0, 8), 0xfb);
}
