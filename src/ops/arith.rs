//! Ripple-carry arithmetic

use super::{check_widths, to_signed, words};
use crate::circuit::{Circuit, Lit};
use crate::context::Context;
use crate::vector::{mask, Vector};

/// `out = x + y + carry_in`, returning the carry out of the top bit
pub(crate) fn add_bits(c: &mut Circuit, x: &[Lit], y: &[Lit], carry_in: Lit, out: &mut [Lit]) -> Lit {
    let mut carry = carry_in;
    for i in 0..out.len() {
        let half = c.xor(x[i], y[i]);
        out[i] = c.xor(half, carry);
        let any = c.or(x[i], y[i]);
        let both = c.and(x[i], y[i]);
        // Majority of x, y and the incoming carry
        carry = c.mux(carry, any, both);
    }
    carry
}

/// `out = x - y`, returning the borrow out of the top bit
pub(crate) fn sub_bits(c: &mut Circuit, x: &[Lit], y: &[Lit], out: &mut [Lit]) -> Lit {
    let mut borrow = Lit::FALSE;
    for i in 0..out.len() {
        let half = c.xor(x[i], y[i]);
        out[i] = c.xor(half, borrow);
        let any = c.or(!x[i], y[i]);
        let both = c.and(!x[i], y[i]);
        borrow = c.mux(borrow, any, both);
    }
    borrow
}

/// Two's complement negation in place
pub(crate) fn negate_bits(c: &mut Circuit, bits: &mut [Lit]) {
    // ~x + 1: the carry ripples until the first set bit of x
    let mut carry = Lit::TRUE;
    for bit in bits.iter_mut() {
        let inverted = !*bit;
        *bit = c.xor(inverted, carry);
        carry = c.and(inverted, carry);
    }
}

pub fn add(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    check_widths("add", x, y);
    if let Some((a, b)) = words(x, y) {
        return cx.constant(x.width(), a.wrapping_add(b));
    }
    let (xs, ys) = (cx.bits_of(x), cx.bits_of(y));
    let mut out = cx.pool.bits(x.width());
    add_bits(&mut cx.circuit, &xs, &ys, Lit::FALSE, &mut out);
    cx.recycle(xs);
    cx.recycle(ys);
    cx.finish(out)
}

pub fn sub(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    check_widths("sub", x, y);
    if let Some((a, b)) = words(x, y) {
        return cx.constant(x.width(), a.wrapping_sub(b));
    }
    let (xs, ys) = (cx.bits_of(x), cx.bits_of(y));
    let mut out = cx.pool.bits(x.width());
    sub_bits(&mut cx.circuit, &xs, &ys, &mut out);
    cx.recycle(xs);
    cx.recycle(ys);
    cx.finish(out)
}

/// Two's complement negation
pub fn negate(cx: &mut Context, x: &Vector) -> Vector {
    if let Some(a) = x.as_u64() {
        return cx.constant(x.width(), a.wrapping_neg());
    }
    let mut bits = cx.bits_of(x);
    negate_bits(&mut cx.circuit, &mut bits);
    cx.finish(bits)
}

/// Absolute value of a two's complement number; the minimum maps to itself
pub fn abs(cx: &mut Context, x: &Vector) -> Vector {
    if let Some(a) = x.as_u64() {
        return cx.constant(x.width(), to_signed(a, x.width()).unsigned_abs());
    }
    let sign = x.msb();
    match sign.const_value() {
        Some(false) => cx.dup(x),
        Some(true) => negate(cx, x),
        None => {
            let mut negated = cx.bits_of(x);
            negate_bits(&mut cx.circuit, &mut negated);
            let mut bits = cx.pool.bits(x.width());
            for (i, bit) in bits.iter_mut().enumerate() {
                *bit = cx.circuit.mux(sign, negated[i], x.bit(i));
            }
            cx.recycle(negated);
            cx.finish(bits)
        }
    }
}

/// Truncating product by shift-and-add
pub fn mul(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    check_widths("mul", x, y);
    if let Some((a, b)) = words(x, y) {
        return cx.constant(x.width(), a.wrapping_mul(b));
    }
    let width = x.width();
    let xs = cx.bits_of(x);
    let mut acc = cx.pool.bits(width);
    let mut partial = cx.pool.bits(width);
    let mut sum = cx.pool.bits(width);
    for j in 0..width {
        let yj = y.bit(j);
        if yj == Lit::FALSE {
            continue;
        }
        // Partial product x * y[j], aligned at bit j
        let len = width - j;
        for i in 0..len {
            partial[i] = cx.circuit.and(xs[i], yj);
        }
        add_bits(&mut cx.circuit, &acc[j..], &partial[..len], Lit::FALSE, &mut sum[..len]);
        acc[j..].copy_from_slice(&sum[..len]);
    }
    cx.recycle(xs);
    cx.recycle(partial);
    cx.recycle(sum);
    cx.finish(acc)
}

/// Number of set bits, at the width of the operand
pub fn popcount(cx: &mut Context, x: &Vector) -> Vector {
    if let Some(a) = x.as_u64() {
        return cx.constant(x.width(), a.count_ones() as u64);
    }
    let mut acc = cx.pool.bits(x.width());
    for i in 0..x.width() {
        // Increment by bit i
        let mut carry = x.bit(i);
        for bit in acc.iter_mut() {
            if carry == Lit::FALSE {
                break;
            }
            let next = cx.circuit.and(*bit, carry);
            *bit = cx.circuit.xor(*bit, carry);
            carry = next;
        }
    }
    cx.finish(acc)
}

/// Unsigned overflow of `x + y`
pub fn carry(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    check_widths("carry", x, y);
    if let Some((a, b)) = words(x, y) {
        let wide = a as u128 + b as u128;
        return Lit::constant(wide > mask(x.width()) as u128);
    }
    let (xs, ys) = (cx.bits_of(x), cx.bits_of(y));
    let mut out = cx.pool.bits(x.width());
    let carry = add_bits(&mut cx.circuit, &xs, &ys, Lit::FALSE, &mut out);
    cx.recycle(xs);
    cx.recycle(ys);
    cx.recycle(out);
    carry
}

/// Signed overflow of `x + y`
pub fn scarry(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    check_widths("scarry", x, y);
    if let Some((a, b)) = words(x, y) {
        let w = x.width();
        let (sa, sb) = (to_signed(a, w) as i128, to_signed(b, w) as i128);
        let sum = sa + sb;
        let (lo, hi) = (-(1i128 << (w - 1)), (1i128 << (w - 1)) - 1);
        return Lit::constant(sum < lo || sum > hi);
    }
    let sum = super::add(cx, x, y);
    let same_sign = cx.circuit.xnor(x.msb(), y.msb());
    let flipped = cx.circuit.xor(sum.msb(), x.msb());
    cx.release(sum);
    cx.circuit.and(same_sign, flipped)
}

/// Signed overflow of `x - y`
pub fn sborrow(cx: &mut Context, x: &Vector, y: &Vector) -> Lit {
    check_widths("sborrow", x, y);
    if let Some((a, b)) = words(x, y) {
        let w = x.width();
        let (sa, sb) = (to_signed(a, w) as i128, to_signed(b, w) as i128);
        let diff = sa - sb;
        let (lo, hi) = (-(1i128 << (w - 1)), (1i128 << (w - 1)) - 1);
        return Lit::constant(diff < lo || diff > hi);
    }
    let diff = super::sub(cx, x, y);
    let differ = cx.circuit.xor(x.msb(), y.msb());
    let flipped = cx.circuit.xor(diff.msb(), x.msb());
    cx.release(diff);
    cx.circuit.and(differ, flipped)
}
