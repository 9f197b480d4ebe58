//! Operation library
//!
//! Every operation follows the same decision order:
//!
//! 1. All operands concrete: compute natively, never touching the circuit.
//! 2. Otherwise promote operands to per-bit literals.
//! 3. Lower the operation to AND/OR/XOR/MUX gates bit by bit.
//! 4. Demote the result to a word if every output bit came out constant.
//!
//! Operands are borrowed and every result is a newly acquired vector owned by
//! the caller. Mismatched operand widths are a calling-model defect and
//! panic.

pub mod arith;
pub mod bitwise;
pub mod compare;
pub mod compose;
pub mod divide;
pub mod shift;

pub use arith::{abs, add, carry, mul, negate, popcount, sborrow, scarry, sub};
pub use bitwise::{and, invert, ite, nand, nor, or, reverse_bits, reverse_bytes, select_bits, xnor, xor};
pub use compare::{
    equal, equal_sat, not_equal, sge, sgt, sle, slt, sym_equal, uge, ugt, ule, ult,
};
pub use compose::{concat, extract, join_bytes, sext, split_bytes, trunc, zext};
pub use divide::{div, quot_rem, rem, sdiv, srem};
pub use shift::{ashr, lshr, rotl, rotr, shl};

use crate::vector::Vector;

pub(crate) fn check_widths(op: &str, x: &Vector, y: &Vector) {
    assert_eq!(
        x.width(),
        y.width(),
        "{}: operand widths differ ({} vs {})",
        op,
        x.width(),
        y.width()
    );
}

/// Native words of two concrete operands
pub(crate) fn words(x: &Vector, y: &Vector) -> Option<(u64, u64)> {
    Some((x.as_u64()?, y.as_u64()?))
}

/// Interpret the low `width` bits of `value` as a two's complement number
pub(crate) fn to_signed(value: u64, width: usize) -> i64 {
    if width >= 64 {
        value as i64
    } else {
        let shift = 64 - width;
        ((value << shift) as i64) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_signed() {
        assert_eq!(to_signed(0xff, 8), -1);
        assert_eq!(to_signed(0x7f, 8), 127);
        assert_eq!(to_signed(1, 1), -1);
        assert_eq!(to_signed(u64::MAX, 64), -1);
    }
}
