//! Restoring long division
//!
//! A zero divisor never faults. Unsigned division yields an all-ones
//! quotient and returns the dividend as remainder. Signed division by zero
//! yields zero, while the signed remainder is again the dividend.

use super::arith::sub_bits;
use super::{abs, check_widths, equal, ite, negate, to_signed, words};
use crate::circuit::{Circuit, Lit};
use crate::context::Context;
use crate::vector::{mask, Vector};

/// Quotient and remainder bits, most significant quotient bit first
fn quot_rem_bits(c: &mut Circuit, x: &[Lit], y: &[Lit], q: &mut [Lit], rem: &mut [Lit]) {
    let n = x.len();
    rem.copy_from_slice(x);
    // high_or[k] is set when any of y[k..] is, i.e. y << (n - k) overflows
    let mut high_or = vec![Lit::FALSE; n + 1];
    for k in (0..n).rev() {
        high_or[k] = c.or(high_or[k + 1], y[k]);
    }
    let mut shifted = vec![Lit::FALSE; n];
    let mut diff = vec![Lit::FALSE; n];
    for j in (0..n).rev() {
        let overflow = high_or[n - j];
        if overflow == Lit::TRUE {
            q[j] = Lit::FALSE;
            continue;
        }
        for i in 0..n {
            shifted[i] = if i >= j { y[i - j] } else { Lit::FALSE };
        }
        let borrow = sub_bits(c, rem, &shifted, &mut diff);
        let fits = c.and(!overflow, !borrow);
        q[j] = fits;
        match fits.const_value() {
            Some(true) => rem.copy_from_slice(&diff),
            Some(false) => {}
            None => {
                for i in 0..n {
                    rem[i] = c.mux(fits, diff[i], rem[i]);
                }
            }
        }
    }
}

/// Unsigned quotient and remainder together
pub fn quot_rem(cx: &mut Context, x: &Vector, y: &Vector) -> (Vector, Vector) {
    check_widths("quot_rem", x, y);
    let width = x.width();
    if let Some((a, b)) = words(x, y) {
        if b == 0 {
            return (cx.constant(width, mask(width)), cx.constant(width, a));
        }
        return (cx.constant(width, a / b), cx.constant(width, a % b));
    }
    let (xs, ys) = (cx.bits_of(x), cx.bits_of(y));
    let mut q = cx.pool.bits(width);
    let mut r = cx.pool.bits(width);
    quot_rem_bits(&mut cx.circuit, &xs, &ys, &mut q, &mut r);
    cx.recycle(xs);
    cx.recycle(ys);
    (cx.finish(q), cx.finish(r))
}

pub fn div(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    let (q, r) = quot_rem(cx, x, y);
    cx.release(r);
    q
}

pub fn rem(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    let (q, r) = quot_rem(cx, x, y);
    cx.release(q);
    r
}

/// Quotient and remainder of the absolute values
fn abs_quot_rem(cx: &mut Context, x: &Vector, y: &Vector) -> (Vector, Vector) {
    let ax = abs(cx, x);
    let ay = abs(cx, y);
    let result = quot_rem(cx, &ax, &ay);
    cx.release(ax);
    cx.release(ay);
    result
}

/// Signed division truncating towards zero
pub fn sdiv(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    check_widths("sdiv", x, y);
    let width = x.width();
    if let Some((a, b)) = words(x, y) {
        if b == 0 {
            return cx.constant(width, 0);
        }
        let q = to_signed(a, width).wrapping_div(to_signed(b, width));
        return cx.constant(width, q as u64);
    }
    if y.as_u64() == Some(0) {
        return cx.constant(width, 0);
    }
    let (q, r) = abs_quot_rem(cx, x, y);
    cx.release(r);
    let neg = cx.circuit.xor(x.msb(), y.msb());
    let negated = negate(cx, &q);
    let signed = ite(cx, neg, &negated, &q);
    cx.release(q);
    cx.release(negated);

    let zero = cx.constant(width, 0);
    let divisor_zero = equal(cx, y, &zero);
    let result = ite(cx, divisor_zero, &zero, &signed);
    cx.release(zero);
    cx.release(signed);
    result
}

/// Signed remainder, taking the sign of the dividend
pub fn srem(cx: &mut Context, x: &Vector, y: &Vector) -> Vector {
    check_widths("srem", x, y);
    let width = x.width();
    if let Some((a, b)) = words(x, y) {
        if b == 0 {
            return cx.constant(width, a);
        }
        let r = to_signed(a, width).wrapping_rem(to_signed(b, width));
        return cx.constant(width, r as u64);
    }
    let (q, r) = abs_quot_rem(cx, x, y);
    cx.release(q);
    let negated = negate(cx, &r);
    let result = ite(cx, x.msb(), &negated, &r);
    cx.release(r);
    cx.release(negated);
    result
}
