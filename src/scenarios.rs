//! Reference drivers
//!
//! Two small programs written directly against [`MachineState`]: Euclid's
//! algorithm as a recursive branch loop over concrete memory, and a byte
//! substitution through a 256-entry table held in symbolic memory.

use crate::engine::MachineState;
use crate::vector::Vector;

/// Concrete memory layout of the GCD driver
pub const GCD_OUT: u64 = 0;
pub const GCD_A: u64 = 4;
pub const GCD_B: u64 = 8;
pub const GCD_MEMORY_SIZE: usize = 24;

/// Symbolic memory address width used by both drivers
pub const ADDRESS_BITS: usize = 32;
pub const HEAP_START: u64 = 0x2000_0000;

/// Where the substitution table lives in symbolic memory
pub const TABLE_BASE: u64 = 0x1234_abcd;
/// Where [`permute`] keeps its working buffer
pub const BUFFER_BASE: u64 = 0xabcd_1234;

/// A byte permutation: every value appears exactly once
pub const TRANSLATE: [u8; 256] = [
    153, 214, 158, 155, 57, 138, 52, 101, 192, 157, 118, 251, 139, 33, 160, 210, 0, 255, 229, 182,
    143, 159, 250, 179, 166, 128, 134, 114, 6, 30, 156, 206, 144, 113, 146, 227, 211, 121, 38, 215,
    167, 147, 183, 100, 39, 252, 105, 31, 246, 205, 161, 109, 126, 58, 122, 188, 247, 207, 104, 50,
    150, 203, 193, 106, 28, 224, 124, 51, 83, 222, 189, 231, 204, 66, 29, 7, 9, 54, 56, 27, 88, 175,
    72, 226, 116, 173, 110, 103, 24, 55, 169, 35, 49, 59, 3, 16, 135, 178, 67, 25, 194, 80, 15, 5,
    217, 84, 181, 95, 102, 137, 172, 81, 131, 89, 82, 136, 151, 208, 90, 32, 86, 45, 91, 125, 41,
    127, 112, 220, 191, 253, 168, 68, 149, 47, 190, 245, 123, 20, 162, 209, 92, 199, 170, 93, 198,
    171, 76, 111, 23, 48, 235, 142, 85, 145, 42, 238, 1, 71, 232, 21, 163, 154, 10, 254, 4, 22, 164,
    197, 129, 174, 242, 223, 73, 248, 241, 53, 130, 40, 61, 63, 11, 97, 218, 17, 152, 196, 8, 26,
    165, 187, 74, 219, 18, 148, 65, 202, 216, 176, 64, 239, 243, 79, 249, 115, 119, 19, 233, 120,
    230, 184, 14, 75, 60, 94, 117, 132, 200, 78, 185, 62, 96, 13, 221, 180, 213, 34, 70, 2, 44, 12,
    43, 244, 236, 133, 87, 141, 98, 99, 186, 37, 46, 234, 140, 69, 177, 201, 195, 225, 107, 77,
    237, 212, 240, 36, 228, 108,
];

/// A machine sized for the GCD driver
pub fn gcd_machine(name: &str) -> MachineState {
    MachineState::create(name, 0, GCD_MEMORY_SIZE, HEAP_START, ADDRESS_BITS)
}

/// A machine for the table drivers; they only use symbolic memory
pub fn table_machine(name: &str) -> MachineState {
    MachineState::create(name, 0, 0, HEAP_START, ADDRESS_BITS)
}

/// `gcd(a, b)` for two bytes. Either operand may be symbolic; the result is
/// then a circuit over their inputs.
pub fn gcd(ms: &mut MachineState, a: &Vector, b: &Vector) -> Vector {
    assert_eq!(a.width(), 8, "gcd operands are bytes");
    assert_eq!(b.width(), 8, "gcd operands are bytes");
    ms.store_concrete_le(GCD_A, a);
    ms.store_concrete_le(GCD_B, b);
    gcd_step(ms);
    ms.load_concrete_le(GCD_OUT, 1)
}

/// One round: if `b == 0` the answer is `a`, otherwise recurse on
/// `(b, a mod b)`
fn gcd_step(ms: &mut MachineState) {
    let b = ms.load_concrete_le(GCD_B, 1);
    let zero = ms.constant(8, 0);
    let done = ms.equal(&b, &zero);
    ms.release(zero);
    ms.release(b);

    ms.conditional(
        done,
        &mut |ms| {
            let a = ms.load_concrete_le(GCD_A, 1);
            ms.store_concrete_le(GCD_OUT, &a);
            ms.release(a);
        },
        &mut |_| {},
        &mut |ms| {
            let a = ms.load_concrete_le(GCD_A, 1);
            let b = ms.load_concrete_le(GCD_B, 1);
            let r = ms.rem(&a, &b);
            ms.store_concrete_le(GCD_A, &b);
            ms.store_concrete_le(GCD_B, &r);
            for v in [r, b, a] {
                ms.release(v);
            }
            gcd_step(ms);
        },
        &mut |_| {},
        true,
    );
}

/// Write [`TRANSLATE`] to symbolic memory starting at `base`
pub fn store_table(ms: &mut MachineState, base: &Vector) {
    let entries: Vec<Vector> = TRANSLATE.iter().map(|&v| ms.constant(8, v as u64)).collect();
    ms.store_symbolic_array_le(base, &entries);
    for v in entries {
        ms.release(v);
    }
}

/// `table[index]` for an 8-bit index, read from the table at `base`
pub fn table_lookup(ms: &mut MachineState, base: &Vector, index: &Vector) -> Vector {
    let offset = ms.zext(index, base.width());
    let addr = ms.add(base, &offset);
    let value = ms.load_symbolic_le(&addr, 1);
    ms.release(addr);
    ms.release(offset);
    value
}

/// Substitute every byte of `input` through the table at [`TABLE_BASE`],
/// in place in a symbolic-memory buffer, and return the translated bytes
pub fn permute(ms: &mut MachineState, input: &[Vector]) -> Vec<Vector> {
    let table = ms.constant(ADDRESS_BITS, TABLE_BASE);
    let buffer = ms.constant(ADDRESS_BITS, BUFFER_BASE);
    store_table(ms, &table);
    ms.store_symbolic_array_le(&buffer, input);

    for i in 0..input.len() {
        let offset = ms.constant(ADDRESS_BITS, i as u64);
        let addr = ms.add(&buffer, &offset);
        let byte = ms.load_symbolic_le(&addr, 1);
        let translated = table_lookup(ms, &table, &byte);
        ms.store_symbolic_le(&addr, &translated);
        for v in [translated, byte, addr, offset] {
            ms.release(v);
        }
    }

    let output = ms.load_symbolic_array_le(&buffer, input.len(), 1);
    ms.release(buffer);
    ms.release(table);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(values: &[u64]) -> Vec<bool> {
        values
            .iter()
            .flat_map(|&v| (0..8).map(move |i| (v >> i) & 1 == 1))
            .collect()
    }

    #[test]
    fn test_gcd_concrete() {
        let mut ms = gcd_machine("gcd");
        let a = ms.constant(8, 12);
        let b = ms.constant(8, 8);
        let out = gcd(&mut ms, &a, &b);
        assert_eq!(out.as_u64(), Some(4));
        for v in [out, b, a] {
            ms.release(v);
        }
        let (leaks, diagnostics) = ms.destroy();
        assert!(leaks.is_clean());
        assert_eq!(diagnostics.read_before_write_count(), 0);
    }

    #[test]
    fn test_gcd_concrete_zero_operand() {
        let mut ms = gcd_machine("gcd");
        let a = ms.constant(8, 9);
        let b = ms.constant(8, 0);
        let out = gcd(&mut ms, &a, &b);
        assert_eq!(out.as_u64(), Some(9));
    }

    #[test]
    fn test_gcd_symbolic() {
        let mut ms = gcd_machine("gcd-sym");
        let a = ms.new_symbolic("a", 8);
        let b = ms.new_symbolic("b", 8);
        let out = gcd(&mut ms, &a, &b);
        assert!(!ms.branch_error());
        for (x, y, expected) in [(12, 8, 4), (8, 12, 4), (7, 0, 7), (0, 5, 5), (35, 21, 7), (233, 144, 1)] {
            assert_eq!(ms.evaluate(&out, &bits(&[x, y])), expected, "gcd({}, {})", x, y);
        }
        for v in [out, b, a] {
            ms.release(v);
        }
        assert!(ms.destroy().0.is_clean());
    }

    #[test]
    fn test_translate_is_permutation() {
        let mut seen = [false; 256];
        for &v in TRANSLATE.iter() {
            assert!(!seen[v as usize]);
            seen[v as usize] = true;
        }
    }

    #[test]
    fn test_table_lookup_concrete_index() {
        let mut ms = table_machine("sbox");
        let base = ms.constant(ADDRESS_BITS, TABLE_BASE);
        store_table(&mut ms, &base);
        for i in [0u64, 1, 17, 128, 255] {
            let index = ms.constant(8, i);
            let value = table_lookup(&mut ms, &base, &index);
            assert_eq!(value.as_u64(), Some(TRANSLATE[i as usize] as u64));
            ms.release(value);
            ms.release(index);
        }
        ms.release(base);
        assert_eq!(ms.diagnostics().read_before_write_count(), 0);
        assert!(ms.destroy().0.is_clean());
    }

    #[test]
    fn test_table_lookup_symbolic_index() {
        let mut ms = table_machine("sbox-sym");
        let base = ms.constant(ADDRESS_BITS, TABLE_BASE);
        store_table(&mut ms, &base);
        let index = ms.new_symbolic("i", 8);
        let value = table_lookup(&mut ms, &base, &index);
        assert!(value.is_symbolic());
        for i in [0u64, 3, 100, 254, 255] {
            assert_eq!(ms.evaluate(&value, &bits(&[i])), TRANSLATE[i as usize] as u128);
        }
        assert_eq!(ms.diagnostics().read_before_write_count(), 0);
    }

    #[test]
    fn test_permute_symbolic_buffer() {
        let mut ms = table_machine("perm");
        let input: Vec<Vector> = (0..3).map(|i| ms.new_symbolic(&format!("in{}", i), 8)).collect();
        let output = permute(&mut ms, &input);
        let values = [5u64, 200, 0];
        let asg = bits(&values);
        for (v, &x) in output.iter().zip(&values) {
            assert_eq!(ms.evaluate(v, &asg), TRANSLATE[x as usize] as u128);
        }
        for v in output.into_iter().chain(input) {
            ms.release(v);
        }
        assert!(ms.destroy().0.is_clean());
    }
}
