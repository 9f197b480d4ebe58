use std::process::Command;

use aigsym::scenarios::{self, ADDRESS_BITS, TABLE_BASE, TRANSLATE};

fn aigsym() -> Command {
    Command::new(env!("CARGO_BIN_EXE_aigsym"))
}

#[test]
fn test_gcd_of_12_and_8_is_4() {
    let mut ms = scenarios::gcd_machine("gcd");
    let a = ms.constant(8, 12);
    let b = ms.constant(8, 8);
    let out = scenarios::gcd(&mut ms, &a, &b);
    assert_eq!(out.as_u64(), Some(4));
    assert_eq!(ms.fork_depth(), 0);
    for v in [out, a, b] {
        ms.release(v);
    }
    let (leaks, diagnostics) = ms.destroy();
    assert!(leaks.is_clean());
    assert!(diagnostics.events().is_empty());
}

#[test]
fn test_gcd_concrete_pairs() {
    for (a, b, expected) in [(48u64, 18u64, 6u64), (17, 5, 1), (0, 0, 0), (255, 15, 15)] {
        let mut ms = scenarios::gcd_machine("gcd");
        let va = ms.constant(8, a);
        let vb = ms.constant(8, b);
        let out = scenarios::gcd(&mut ms, &va, &vb);
        assert_eq!(out.as_u64(), Some(expected), "gcd({}, {})", a, b);
    }
}

#[test]
fn test_table_lookup_every_concrete_index() {
    let mut ms = scenarios::table_machine("sbox");
    let base = ms.constant(ADDRESS_BITS, TABLE_BASE);
    scenarios::store_table(&mut ms, &base);
    for i in 0..256u64 {
        let index = ms.constant(8, i);
        let value = scenarios::table_lookup(&mut ms, &base, &index);
        assert_eq!(value.as_u64(), Some(TRANSLATE[i as usize] as u64), "table[{}]", i);
        ms.release(value);
        ms.release(index);
    }
    ms.release(base);
    let (leaks, diagnostics) = ms.destroy();
    assert!(leaks.is_clean());
    assert_eq!(diagnostics.read_before_write_count(), 0);
}

#[test]
fn test_table_at_symbolic_base() {
    let mut ms = scenarios::table_machine("sbox-base");
    let base = ms.new_symbolic("base", ADDRESS_BITS);
    scenarios::store_table(&mut ms, &base);
    for i in [0u64, 42, 255] {
        let index = ms.constant(8, i);
        let value = scenarios::table_lookup(&mut ms, &base, &index);
        assert_eq!(value.as_u64(), Some(TRANSLATE[i as usize] as u64), "table[{}]", i);
        ms.release(value);
        ms.release(index);
    }
    ms.release(base);
    assert_eq!(ms.diagnostics().read_before_write_count(), 0);
}

#[test]
fn test_cli_gcd() {
    let output = aigsym()
        .args(["gcd", "--a", "12", "--b", "8"])
        .output()
        .expect("Failed to execute aigsym");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gcd(12, 8) = 4"), "stdout: {}", stdout);
}

#[test]
fn test_cli_sbox_symbolic_index() {
    let output = aigsym()
        .args(["sbox", "--index", "7", "--symbolic-index"])
        .output()
        .expect("Failed to execute aigsym");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("table[7] = {}", TRANSLATE[7])), "stdout: {}", stdout);
}

#[test]
fn test_cli_gcd_export() {
    let path = std::env::temp_dir().join(format!("aigsym-gcd-{}.aig", std::process::id()));
    let output = aigsym()
        .args(["gcd", "--a", "9", "--b", "6", "--symbolic", "--export"])
        .arg(&path)
        .output()
        .expect("Failed to execute aigsym");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let bytes = std::fs::read(&path).expect("exported circuit");
    let _ = std::fs::remove_file(&path);
    assert!(bytes.starts_with(b"aig "));
}
