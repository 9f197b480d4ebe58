//! Fixed-width values that are either a native word or one literal per bit
//!
//! A `Vector` of width N is concrete (an N-bit integer held in a `u64`) or
//! symbolic (N circuit literals, least significant bit first). Widths above
//! 64 are always symbolic. Vectors are not `Clone`: copies go through
//! [`VectorPool::dup`] so the pool can account for every live value.

pub mod pool;

pub use pool::{PoolStats, VectorPool};

use crate::circuit::{Circuit, Lit};
use std::fmt;

/// Largest width a concrete vector can hold
pub const WORD_BITS: usize = 64;

/// Mask selecting the low `width` bits of a word
pub fn mask(width: usize) -> u64 {
    if width >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Representation of a vector's bits
#[derive(Debug, PartialEq, Eq)]
pub enum Repr {
    /// Always masked to the vector width
    Concrete(u64),
    /// Least significant bit first
    Symbolic(Vec<Lit>),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Vector {
    width: usize,
    repr: Repr,
}

impl Vector {
    pub(crate) fn from_word(width: usize, value: u64) -> Self {
        assert!(
            width > 0 && width <= WORD_BITS,
            "concrete vector width {} outside 1..=64",
            width
        );
        Self {
            width,
            repr: Repr::Concrete(value & mask(width)),
        }
    }

    pub(crate) fn from_lits(bits: Vec<Lit>) -> Self {
        assert!(!bits.is_empty(), "zero-width vector");
        Self {
            width: bits.len(),
            repr: Repr::Symbolic(bits),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn repr(&self) -> &Repr {
        &self.repr
    }

    pub(crate) fn into_repr(self) -> Repr {
        self.repr
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self.repr, Repr::Concrete(_))
    }

    pub fn is_symbolic(&self) -> bool {
        !self.is_concrete()
    }

    /// The native word of a concrete vector
    pub fn as_u64(&self) -> Option<u64> {
        match self.repr {
            Repr::Concrete(value) => Some(value),
            Repr::Symbolic(_) => None,
        }
    }

    /// Bit `i` as a literal; constant for concrete vectors
    pub fn bit(&self, i: usize) -> Lit {
        assert!(i < self.width, "bit {} of a {}-bit vector", i, self.width);
        match &self.repr {
            Repr::Concrete(value) => Lit::constant((value >> i) & 1 == 1),
            Repr::Symbolic(bits) => bits[i],
        }
    }

    pub fn msb(&self) -> Lit {
        self.bit(self.width - 1)
    }

    /// Per-bit literals, least significant first
    pub fn lits(&self) -> Vec<Lit> {
        (0..self.width).map(|i| self.bit(i)).collect()
    }

    /// Mutable access to the literals of a symbolic vector
    pub(crate) fn lits_mut(&mut self) -> Option<&mut [Lit]> {
        match &mut self.repr {
            Repr::Concrete(_) => None,
            Repr::Symbolic(bits) => Some(bits),
        }
    }

    /// Value when every bit is a constant literal (widths up to 128)
    pub fn to_u128(&self) -> Option<u128> {
        if self.width > 128 {
            return None;
        }
        match &self.repr {
            Repr::Concrete(value) => Some(*value as u128),
            Repr::Symbolic(bits) => {
                let mut value = 0u128;
                for (i, lit) in bits.iter().enumerate() {
                    if lit.const_value()? {
                        value |= 1 << i;
                    }
                }
                Some(value)
            }
        }
    }

    /// Value of the vector under an assignment of the circuit inputs
    pub fn evaluate(&self, circuit: &Circuit, assignment: &[bool]) -> u128 {
        assert!(self.width <= 128, "cannot evaluate a {}-bit vector", self.width);
        match &self.repr {
            Repr::Concrete(value) => *value as u128,
            Repr::Symbolic(bits) => circuit
                .evaluate(bits, assignment)
                .into_iter()
                .enumerate()
                .fold(0u128, |acc, (i, b)| acc | ((b as u128) << i)),
        }
    }

    /// Whether every bit is a constant literal
    pub fn is_fully_constant(&self) -> bool {
        match &self.repr {
            Repr::Concrete(_) => true,
            Repr::Symbolic(bits) => bits.iter().all(|l| l.is_const()),
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Concrete(value) => write!(f, "{:#x}:{}", value, self.width),
            Repr::Symbolic(bits) => {
                write!(f, "[")?;
                for (i, bit) in bits.iter().enumerate().rev() {
                    if i + 1 != bits.len() {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", bit)?;
                }
                write!(f, "]:{}", self.width)
            }
        }
    }
}
