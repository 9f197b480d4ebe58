//! Equality and ordering, producing single literals

use super::{check_widths, to_signed, words};
use crate::circuit::{Circuit, Lit};
use crate::context::Context;
use crate::vector::Vector;

/// `x < y` unsigned, scanning from the most significant bit
pub(crate) fn ult_bits(c: &mut Circuit, x: &[Lit], y: &[Lit]) -> Lit {
    let mut less = Lit::FALSE;
    let mut known = Lit::FALSE;
    for i in (0..x.len()).rev() {
        let here = c.and(!x[i], y[i]);
        less = c.mux(known, less, here);
        let differs = c.xor(x[i], y[i]);
        known = c.or(known, differs);
        if known == Lit::TRUE {
            break;
        }
    }
    less
}

pub(crate) fn eq_bits(c: &mut Circuit, x: &[Lit], y: &[Lit]) -> Lit {
    let mut acc = Lit::TRUE;
    for (&a, &b) in x.iter().zip(y) {
        let same = c.xnor(a, b);
        acc = c.and(acc, same);
        if acc == Lit::FALSE {
            break;
        }
    }
    acc
}

/// Structural equality without building gates: `Some` when the answer is
/// evident from the literals alone
pub fn sym_equal(x: &Vector, y: &Vector) -> Option<bool> {
    check_widths("sym_equal", x, y);
    if let Some((a, b)) = words(x, y) {
        return Some(a == b);
    }
    let mut undecided = false;
    for i in 0..x.width() {
        let (a, b) = (x.bit(i), y.bit(i));
        if a == b {
            continue;
        }
        if a == !b {
            return Some(false);
        }
        undecided = true;
    }
    if undecided {
        None
    } else {
        Some(true)
    }
}

pub fn equal(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    if let Some(known) = sym_equal(x, y) {
        return Lit::constant(known);
    }
    let (xs, ys) = (cx.bits_of(x), cx.bits_of(y));
    let eq = eq_bits(&mut cx.circuit, &xs, &ys);
    cx.recycle(xs);
    cx.recycle(ys);
    eq
}

/// Equality strengthened by the SAT oracle under the current path condition
pub fn equal_sat(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    let eq = equal(cx, x, y);
    cx.settle(eq)
}

pub fn not_equal(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    !equal(cx, x, y)
}

pub fn ult(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    check_widths("ult", x, y);
    if let Some((a, b)) = words(x, y) {
        return Lit::constant(a < b);
    }
    let (xs, ys) = (cx.bits_of(x), cx.bits_of(y));
    let less = ult_bits(&mut cx.circuit, &xs, &ys);
    cx.recycle(xs);
    cx.recycle(ys);
    less
}

pub fn ule(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    !ult(cx, y, x)
}

pub fn ugt(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    ult(cx, y, x)
}

pub fn uge(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    !ult(cx, x, y)
}

pub fn slt(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    check_widths("slt", x, y);
    if let Some((a, b)) = words(x, y) {
        let w = x.width();
        return Lit::constant(to_signed(a, w) < to_signed(b, w));
    }
    let (sx, sy) = (x.msb(), y.msb());
    if let (Some(a), Some(b)) = (sx.const_value(), sy.const_value()) {
        if a != b {
            // Negative is smaller
            return Lit::constant(a);
        }
    }
    let unsigned = ult(cx, x, y);
    let signs_differ = cx.circuit.xor(sx, sy);
    cx.circuit.mux(signs_differ, sx, unsigned)
}

pub fn sle(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    !slt(cx, y, x)
}

pub fn sgt(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    slt(cx, y, x)
}

pub fn sge(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    !slt(cx, x, y)
}
