//! Shifts and rotates
//!
//! The shift amount may have a different width than the value. A concrete
//! amount splices bits directly; a symbolic one goes through one layer of
//! multiplexers per amount bit, each layer conditionally moving by the next
//! power of two.

use super::to_signed;
use crate::circuit::Lit;
use crate::context::Context;
use crate::vector::Vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    Left,
    LogicalRight,
    ArithmeticRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rotate {
    Left,
    Right,
}

/// Amount as a number when every bit is constant, saturating at `u64::MAX`
fn const_amount(amount: &Vector) -> Option<u64> {
    amount
        .to_u128()
        .map(|v| u64::try_from(v).unwrap_or(u64::MAX))
}

fn shift_native(kind: Shift, value: u64, k: u64, width: usize) -> u64 {
    let in_range = k < width as u64;
    match kind {
        Shift::Left if in_range => value << k,
        Shift::LogicalRight if in_range => value >> k,
        Shift::Left | Shift::LogicalRight => 0,
        Shift::ArithmeticRight => {
            let signed = to_signed(value, width);
            (signed >> k.min(63)) as u64
        }
    }
}

fn shift(cx: &mut Context, x: &Vector, amount: &Vector, kind: Shift) -> Vector {
    let width = x.width();
    if let (Some(a), Some(k)) = (x.as_u64(), const_amount(amount)) {
        return cx.constant(width, shift_native(kind, a, k, width));
    }
    let xs = cx.bits_of(x);
    let fill = match kind {
        Shift::ArithmeticRight => xs[width - 1],
        _ => Lit::FALSE,
    };
    // Bit i after moving `step` places, where `None` means past the width
    let source = |bits: &[Lit], i: usize, step: Option<usize>| -> Lit {
        let Some(step) = step else { return fill };
        match kind {
            Shift::Left if i >= step => bits[i - step],
            Shift::Left => Lit::FALSE,
            _ if i + step < width => bits[i + step],
            _ => fill,
        }
    };

    let mut out = cx.pool.bits(width);
    if let Some(k) = const_amount(amount) {
        let step = usize::try_from(k).ok().filter(|&s| s < width);
        for (i, bit) in out.iter_mut().enumerate() {
            *bit = source(&xs, i, step);
        }
    } else {
        out.copy_from_slice(&xs);
        let mut next = cx.pool.bits(width);
        for b in 0..amount.width() {
            let sel = amount.bit(b);
            if sel == Lit::FALSE {
                continue;
            }
            let step = (b < usize::BITS as usize - 1)
                .then(|| 1usize << b)
                .filter(|&s| s < width);
            for (i, bit) in next.iter_mut().enumerate() {
                let moved = source(&out, i, step);
                *bit = cx.circuit.mux(sel, moved, out[i]);
            }
            std::mem::swap(&mut out, &mut next);
        }
        cx.recycle(next);
    }
    cx.recycle(xs);
    cx.finish(out)
}

pub fn shl(cx: &mut Context, x: &Vector, amount: &Vector) -> Vector {
    shift(cx, x, amount, Shift::Left)
}

pub fn lshr(cx: &mut Context, x: &Vector, amount: &Vector) -> Vector {
    shift(cx, x, amount, Shift::LogicalRight)
}

pub fn ashr(cx: &mut Context, x: &Vector, amount: &Vector) -> Vector {
    shift(cx, x, amount, Shift::ArithmeticRight)
}

fn rotate(cx: &mut Context, x: &Vector, amount: &Vector, dir: Rotate) -> Vector {
    let width = x.width();
    // Full-width amount modulo the width
    let const_step = amount.to_u128().map(|k| (k % width as u128) as usize);
    if let (Some(a), Some(k)) = (x.as_u64(), const_step) {
        if k == 0 {
            return cx.constant(width, a);
        }
        let value = match dir {
            Rotate::Left => (a << k) | (a >> (width - k)),
            Rotate::Right => (a >> k) | (a << (width - k)),
        };
        return cx.constant(width, value);
    }
    let source = |bits: &[Lit], i: usize, step: usize| -> Lit {
        match dir {
            Rotate::Left => bits[(i + width - step) % width],
            Rotate::Right => bits[(i + step) % width],
        }
    };

    let xs = cx.bits_of(x);
    let mut out = cx.pool.bits(width);
    if let Some(step) = const_step {
        for (i, bit) in out.iter_mut().enumerate() {
            *bit = source(&xs, i, step);
        }
    } else {
        out.copy_from_slice(&xs);
        let mut next = cx.pool.bits(width);
        // 2^b mod width, by doubling
        let mut step = 1 % width;
        for b in 0..amount.width() {
            let sel = amount.bit(b);
            if sel != Lit::FALSE && step != 0 {
                for (i, bit) in next.iter_mut().enumerate() {
                    let moved = source(&out, i, step);
                    *bit = cx.circuit.mux(sel, moved, out[i]);
                }
                std::mem::swap(&mut out, &mut next);
            }
            step = (step * 2) % width;
        }
        cx.recycle(next);
    }
    cx.recycle(xs);
    cx.finish(out)
}

/// Rotate towards the most significant bit; the amount is taken modulo the width
pub fn rotl(cx: &mut Context, x: &Vector, amount: &Vector) -> Vector {
    rotate(cx, x, amount, Rotate::Left)
}

pub fn rotr(cx: &mut Context, x: &Vector, amount: &Vector) -> Vector {
    rotate(cx, x, amount, Rotate::Right)
}
