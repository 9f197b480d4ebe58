//! Bitwise operations and selection

use super::{check_widths, words};
use crate::circuit::{Circuit, Lit};
use crate::context::Context;
use crate::vector::{mask, Vector};

fn bitwise2(
    cx: &mut Context,
    op: &str,
    x: &Vector,
    y: &Vector,
    native: fn(u64, u64) -> u64,
    gate: fn(&mut Circuit, Lit, Lit) -> Lit,
) -> Vector {
    check_widths(op, x, y);
    if let Some((a, b)) = words(x, y) {
        return cx.constant(x.width(), native(a, b));
    }
    let mut bits = cx.pool.bits(x.width());
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = gate(&mut cx.circuit, x.bit(i), y.bit(i));
    }
    cx.finish(bits)
}

pub fn and(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    bitwise2(cx, "and", x, y, |a, b| a & b, Circuit::and)
}

pub fn or(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    bitwise2(cx, "or", x, y, |a, b| a | b, Circuit::or)
}

pub fn xor(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    bitwise2(cx, "xor", x, y, |a, b| a ^ b, Circuit::xor)
}

pub fn nand(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    bitwise2(cx, "nand", x, y, |a, b| !(a & b), |c, a, b| !c.and(a, b))
}

pub fn nor(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    bitwise2(cx, "nor", x, y, |a, b| !(a | b), |c, a, b| !c.or(a, b))
}

pub fn xnor(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    bitwise2(cx, "xnor", x, y, |a, b| !(a ^ b), Circuit::xnor)
}

/// Bitwise complement
pub fn invert(cx: &mut Context, x: &Vector) -> Vector {
    if let Some(a) = x.as_u64() {
        return cx.constant(x.width(), !a & mask(x.width()));
    }
    let mut bits = cx.bits_of(x);
    for bit in bits.iter_mut() {
        *bit = !*bit;
    }
    cx.finish(bits)
}

/// `c ? t : f` over whole vectors
pub fn ite(cx: &mut Context, c: Lit, t: &Vector, f: &Vector) -> Vector {
    check_widths("ite", t, f);
    if let Some(v) = c.const_value() {
        return cx.dup(if v { t } else { f });
    }
    if let Some((a, b)) = words(t, f) {
        if a == b {
            return cx.constant(t.width(), a);
        }
    }
    let mut bits = cx.pool.bits(t.width());
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = cx.circuit.mux(c, t.bit(i), f.bit(i));
    }
    cx.finish(bits)
}

/// Per-bit selection: bit i is `c[i] ? t[i] : f[i]`
pub fn select_bits(cx: &mut Context, c: &Vector, t: &Vector, f: &Vector) -> Vector {
    check_widths("select_bits", c, t);
    check_widths("select_bits", t, f);
    if let (Some(m), Some((a, b))) = (c.as_u64(), words(t, f)) {
        return cx.constant(t.width(), (m & a) | (!m & b));
    }
    let mut bits = cx.pool.bits(t.width());
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = cx.circuit.mux(c.bit(i), t.bit(i), f.bit(i));
    }
    cx.finish(bits)
}

/// Mirror the bit order
pub fn reverse_bits(cx: &mut Context, x: &Vector) -> Vector {
    let width = x.width();
    if let Some(a) = x.as_u64() {
        return cx.constant(width, a.reverse_bits() >> (64 - width));
    }
    let mut bits = cx.pool.bits(width);
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = x.bit(width - 1 - i);
    }
    cx.finish(bits)
}

/// Mirror the byte order; the width must be a whole number of bytes
pub fn reverse_bytes(cx: &mut Context, x: &Vector) -> Vector {
    let width = x.width();
    assert!(
        width % 8 == 0,
        "reverse_bytes: width {} is not a whole number of bytes",
        width
    );
    if let Some(a) = x.as_u64() {
        return cx.constant(width, a.swap_bytes() >> (64 - width));
    }
    let bytes = width / 8;
    let mut bits = cx.pool.bits(width);
    for (i, bit) in bits.iter_mut().enumerate() {
        let (byte, offset) = (i / 8, i % 8);
        *bit = x.bit((bytes - 1 - byte) * 8 + offset);
    }
    cx.finish(bits)
}
