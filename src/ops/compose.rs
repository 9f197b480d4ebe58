//! Width-changing operations: concatenation, extraction, extension

use crate::circuit::Lit;
use crate::context::Context;
use crate::vector::{mask, Vector, WORD_BITS};

/// `hi` above `lo`; the result is `hi.width() + lo.width()` bits wide
pub fn concat(cx: &mut Context, hi: &Vector, lo: &Vector) -> Vector {
    let width = hi.width() + lo.width();
    if width <= WORD_BITS {
        if let (Some(h), Some(l)) = (hi.as_u64(), lo.as_u64()) {
            return cx.constant(width, (h << lo.width()) | l);
        }
    }
    let mut bits = cx.pool.bits(width);
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = if i < lo.width() {
            lo.bit(i)
        } else {
            hi.bit(i - lo.width())
        };
    }
    cx.finish(bits)
}

/// Bits `lo .. lo + width` of `x`; bits past the top of `x` read as zero
pub fn extract(cx: &mut Context, x: &Vector, lo: usize, width: usize) -> Vector {
    if let Some(a) = x.as_u64() {
        let value = if lo >= WORD_BITS { 0 } else { a >> lo };
        return cx.constant(width, value & mask(width));
    }
    let mut bits = cx.pool.bits(width);
    for (i, bit) in bits.iter_mut().enumerate() {
        let src = lo + i;
        *bit = if src < x.width() { x.bit(src) } else { Lit::FALSE };
    }
    cx.finish(bits)
}

/// Keep the low `width` bits
pub fn trunc(cx: &mut Context, x: &Vector, width: usize) -> Vector {
    assert!(
        width <= x.width(),
        "trunc: cannot truncate {} bits to {}",
        x.width(),
        width
    );
    extract(cx, x, 0, width)
}

/// Zero-extend to `width` bits
pub fn zext(cx: &mut Context, x: &Vector, width: usize) -> Vector {
    assert!(
        width >= x.width(),
        "zext: cannot extend {} bits to {}",
        x.width(),
        width
    );
    extract(cx, x, 0, width)
}

/// Sign-extend to `width` bits
pub fn sext(cx: &mut Context, x: &Vector, width: usize) -> Vector {
    assert!(
        width >= x.width(),
        "sext: cannot extend {} bits to {}",
        x.width(),
        width
    );
    if width <= WORD_BITS {
        if let Some(a) = x.as_u64() {
            let signed = super::to_signed(a, x.width());
            return cx.constant(width, signed as u64);
        }
    }
    let sign = x.msb();
    let mut bits = cx.pool.bits(width);
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = if i < x.width() { x.bit(i) } else { sign };
    }
    cx.finish(bits)
}

/// Split into bytes, least significant first
pub fn split_bytes(cx: &mut Context, x: &Vector) -> Vec<Vector> {
    assert!(
        x.width() % 8 == 0,
        "split_bytes: width {} is not a whole number of bytes",
        x.width()
    );
    (0..x.width() / 8)
        .map(|i| extract(cx, x, i * 8, 8))
        .collect()
}

/// Join bytes given least significant first
pub fn join_bytes(cx: &mut Context, bytes: &[Vector]) -> Vector {
    assert!(!bytes.is_empty(), "join_bytes: no bytes");
    for (i, byte) in bytes.iter().enumerate() {
        assert_eq!(byte.width(), 8, "join_bytes: element {} is not a byte", i);
    }
    let width = bytes.len() * 8;
    if width <= WORD_BITS {
        let value = bytes
            .iter()
            .enumerate()
            .try_fold(0u64, |acc, (i, b)| b.as_u64().map(|b| acc | (b << (8 * i))));
        if let Some(v) = value {
            return cx.constant(width, v);
        }
    }
    let mut bits = cx.pool.bits(width);
    for (i, byte) in bytes.iter().enumerate() {
        for j in 0..8 {
            bits[i * 8 + j] = byte.bit(j);
        }
    }
    cx.finish(bits)
}
