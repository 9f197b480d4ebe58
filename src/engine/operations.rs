//! Per-operation entry points
//!
//! Thin wrappers over [`crate::ops`] bound to the machine's context. The
//! `int_*` and `bool_*` family follows lifter conventions: comparisons and
//! boolean connectives produce an 8-bit vector holding 0 or 1.

use super::MachineState;
use crate::circuit::Lit;
use crate::ops;
use crate::vector::Vector;

impl MachineState {
    pub fn add(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::add(&mut self.cx, x, y)
    }

    pub fn sub(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::sub(&mut self.cx, x, y)
    }

    pub fn mul(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::mul(&mut self.cx, x, y)
    }

    pub fn div(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::div(&mut self.cx, x, y)
    }

    pub fn rem(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::rem(&mut self.cx, x, y)
    }

    pub fn sdiv(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::sdiv(&mut self.cx, x, y)
    }

    pub fn srem(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::srem(&mut self.cx, x, y)
    }

    pub fn and(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::and(&mut self.cx, x, y)
    }

    pub fn or(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::or(&mut self.cx, x, y)
    }

    pub fn xor(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::xor(&mut self.cx, x, y)
    }

    pub fn nand(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::nand(&mut self.cx, x, y)
    }

    pub fn nor(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::nor(&mut self.cx, x, y)
    }

    pub fn xnor(&mut self, x: &Vector, y: &Vector) -> Vector {
        ops::xnor(&mut self.cx, x, y)
    }

    pub fn invert(&mut self, x: &Vector) -> Vector {
        ops::invert(&mut self.cx, x)
    }

    pub fn negate(&mut self, x: &Vector) -> Vector {
        ops::negate(&mut self.cx, x)
    }

    pub fn abs(&mut self, x: &Vector) -> Vector {
        ops::abs(&mut self.cx, x)
    }

    pub fn popcount(&mut self, x: &Vector) -> Vector {
        ops::popcount(&mut self.cx, x)
    }

    pub fn shl(&mut self, x: &Vector, amount: &Vector) -> Vector {
        ops::shl(&mut self.cx, x, amount)
    }

    pub fn lshr(&mut self, x: &Vector, amount: &Vector) -> Vector {
        ops::lshr(&mut self.cx, x, amount)
    }

    pub fn ashr(&mut self, x: &Vector, amount: &Vector) -> Vector {
        ops::ashr(&mut self.cx, x, amount)
    }

    pub fn rotl(&mut self, x: &Vector, amount: &Vector) -> Vector {
        ops::rotl(&mut self.cx, x, amount)
    }

    pub fn rotr(&mut self, x: &Vector, amount: &Vector) -> Vector {
        ops::rotr(&mut self.cx, x, amount)
    }

    pub fn concat(&mut self, hi: &Vector, lo: &Vector) -> Vector {
        ops::concat(&mut self.cx, hi, lo)
    }

    pub fn extract(&mut self, x: &Vector, lo: usize, width: usize) -> Vector {
        ops::extract(&mut self.cx, x, lo, width)
    }

    pub fn zext(&mut self, x: &Vector, width: usize) -> Vector {
        ops::zext(&mut self.cx, x, width)
    }

    pub fn sext(&mut self, x: &Vector, width: usize) -> Vector {
        ops::sext(&mut self.cx, x, width)
    }

    pub fn trunc(&mut self, x: &Vector, width: usize) -> Vector {
        ops::trunc(&mut self.cx, x, width)
    }

    pub fn copy(&mut self, x: &Vector) -> Vector {
        self.cx.dup(x)
    }

    /// `c ? t : f`
    pub fn ite(&mut self, c: Lit, t: &Vector, f: &Vector) -> Vector {
        ops::ite(&mut self.cx, c, t, f)
    }

    pub fn equal(&mut self, x: &Vector, y: &Vector) -> Lit {
        ops::equal(&mut self.cx, x, y)
    }

    pub fn not_equal(&mut self, x: &Vector, y: &Vector) -> Lit {
        ops::not_equal(&mut self.cx, x, y)
    }

    pub fn ult(&mut self, x: &Vector, y: &Vector) -> Lit {
        ops::ult(&mut self.cx, x, y)
    }

    pub fn ule(&mut self, x: &Vector, y: &Vector) -> Lit {
        ops::ule(&mut self.cx, x, y)
    }

    pub fn slt(&mut self, x: &Vector, y: &Vector) -> Lit {
        ops::slt(&mut self.cx, x, y)
    }

    pub fn sle(&mut self, x: &Vector, y: &Vector) -> Lit {
        ops::sle(&mut self.cx, x, y)
    }

    /// Literal that is true when `x` is not zero
    pub fn nonzero(&mut self, x: &Vector) -> Lit {
        let zero = self.cx.constant(x.width(), 0);
        let result = ops::not_equal(&mut self.cx, x, &zero);
        self.cx.release(zero);
        result
    }

    /// 8-bit 0/1 vector from a literal
    pub fn bool_byte(&mut self, lit: Lit) -> Vector {
        if let Some(value) = lit.const_value() {
            return self.cx.constant(8, value as u64);
        }
        let mut bits = self.cx.pool.bits(8);
        bits[0] = lit;
        self.cx.finish(bits)
    }

    pub fn int_equal(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.equal(x, y);
        self.bool_byte(lit)
    }

    pub fn int_notequal(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.not_equal(x, y);
        self.bool_byte(lit)
    }

    pub fn int_less(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.ult(x, y);
        self.bool_byte(lit)
    }

    pub fn int_lessequal(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.ule(x, y);
        self.bool_byte(lit)
    }

    pub fn int_sless(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.slt(x, y);
        self.bool_byte(lit)
    }

    pub fn int_slessequal(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.sle(x, y);
        self.bool_byte(lit)
    }

    /// Unsigned overflow of `x + y`
    pub fn int_carry(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = ops::carry(&mut self.cx, x, y);
        self.bool_byte(lit)
    }

    /// Signed overflow of `x + y`
    pub fn int_scarry(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = ops::scarry(&mut self.cx, x, y);
        self.bool_byte(lit)
    }

    /// Signed overflow of `x - y`
    pub fn int_sborrow(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = ops::sborrow(&mut self.cx, x, y);
        self.bool_byte(lit)
    }

    pub fn bool_and(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.cx.circuit.and(x.bit(0), y.bit(0));
        self.bool_byte(lit)
    }

    pub fn bool_or(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.cx.circuit.or(x.bit(0), y.bit(0));
        self.bool_byte(lit)
    }

    pub fn bool_xor(&mut self, x: &Vector, y: &Vector) -> Vector {
        let lit = self.cx.circuit.xor(x.bit(0), y.bit(0));
        self.bool_byte(lit)
    }

    pub fn bool_negate(&mut self, x: &Vector) -> Vector {
        self.bool_byte(!x.bit(0))
    }

    /// `hi` above `lo`
    pub fn piece(&mut self, hi: &Vector, lo: &Vector) -> Vector {
        self.concat(hi, lo)
    }

    /// `out_bytes` bytes of `x` starting `byte_offset` bytes up; bytes past
    /// the top of `x` read as zero
    pub fn subpiece(&mut self, x: &Vector, byte_offset: usize, out_bytes: usize) -> Vector {
        self.extract(x, byte_offset * 8, out_bytes * 8)
    }

    pub fn zext_bytes(&mut self, x: &Vector, bytes: usize) -> Vector {
        self.zext(x, bytes * 8)
    }

    pub fn sext_bytes(&mut self, x: &Vector, bytes: usize) -> Vector {
        self.sext(x, bytes * 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MachineState {
        MachineState::create("ops", 0, 16, 0, 16)
    }

    #[test]
    fn test_byte_booleans() {
        let mut ms = state();
        let a = ms.constant(16, 5);
        let b = ms.constant(16, 0xfffb);
        assert_eq!(ms.int_equal(&a, &a).as_u64(), Some(1));
        assert_eq!(ms.int_less(&a, &b).as_u64(), Some(1));
        assert_eq!(ms.int_sless(&a, &b).as_u64(), Some(0));
        assert_eq!(ms.int_carry(&a, &b).as_u64(), Some(1));
        let t = ms.constant(8, 1);
        let f = ms.constant(8, 0);
        assert_eq!(ms.bool_and(&t, &f).as_u64(), Some(0));
        assert_eq!(ms.bool_or(&t, &f).as_u64(), Some(1));
        assert_eq!(ms.bool_negate(&f).as_u64(), Some(1));
    }

    #[test]
    fn test_symbolic_bool_byte() {
        let mut ms = state();
        let x = ms.new_symbolic("x", 8);
        let zero = ms.constant(8, 0);
        let eq = ms.int_equal(&x, &zero);
        assert_eq!(eq.width(), 8);
        assert_eq!(ms.evaluate(&eq, &[false; 8]), 1);
        let mut asg = [false; 8];
        asg[3] = true;
        assert_eq!(ms.evaluate(&eq, &asg), 0);
        assert_eq!(eq.bit(7), Lit::FALSE);
    }

    #[test]
    fn test_piece_and_subpiece() {
        let mut ms = state();
        let hi = ms.constant(16, 0xaabb);
        let lo = ms.constant(16, 0xccdd);
        let word = ms.piece(&hi, &lo);
        assert_eq!(word.as_u64(), Some(0xaabb_ccdd));
        assert_eq!(ms.subpiece(&word, 1, 2).as_u64(), Some(0xbbcc));
        assert_eq!(ms.subpiece(&word, 3, 2).as_u64(), Some(0x00aa));
        assert_eq!(ms.sext_bytes(&lo, 4).as_u64(), Some(0xffff_ccdd));
    }
}
