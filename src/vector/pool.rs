//! Size-bucketed vector pool
//!
//! Symbolic vectors need a literal buffer per value; the pool keeps released
//! buffers in one freelist per width and grows a bucket by a whole batch when
//! it runs dry. Every vector handed out is counted so leaks can be reported
//! when a run ends.

use super::{Repr, Vector, WORD_BITS};
use crate::circuit::Lit;
use crate::config::PoolConfig;

/// Allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquired: u64,
    pub released: u64,
    /// Buffers created by bucket growth
    pub grown: u64,
}

impl PoolStats {
    /// Vectors handed out and not yet released
    pub fn live(&self) -> u64 {
        self.acquired - self.released
    }
}

#[derive(Debug)]
pub struct VectorPool {
    buckets: Vec<Vec<Vec<Lit>>>,
    batch: usize,
    stats: PoolStats,
}

impl Default for VectorPool {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

impl VectorPool {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            buckets: Vec::new(),
            batch: config.batch.max(1),
            stats: PoolStats::default(),
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn live(&self) -> u64 {
        self.stats.live()
    }

    /// A zeroed literal buffer of `width` bits, not counted as a vector
    pub fn bits(&mut self, width: usize) -> Vec<Lit> {
        assert!(width > 0, "zero-width vector");
        if self.buckets.len() <= width {
            self.buckets.resize_with(width + 1, Vec::new);
        }
        let bucket = &mut self.buckets[width];
        if bucket.is_empty() {
            tracing::trace!("pool: growing {}-bit bucket by {}", width, self.batch);
            bucket.extend((0..self.batch).map(|_| Vec::with_capacity(width)));
            self.stats.grown += self.batch as u64;
        }
        let mut buf = bucket.pop().unwrap_or_default();
        buf.clear();
        buf.resize(width, Lit::FALSE);
        buf
    }

    /// Return a literal buffer to its bucket
    pub fn recycle(&mut self, buf: Vec<Lit>) {
        let width = buf.len();
        if width == 0 {
            return;
        }
        if self.buckets.len() <= width {
            self.buckets.resize_with(width + 1, Vec::new);
        }
        self.buckets[width].push(buf);
    }

    /// A zero vector; concrete when the width allows it
    pub fn acquire(&mut self, width: usize) -> Vector {
        if width <= WORD_BITS {
            self.constant(width, 0)
        } else {
            let bits = self.bits(width);
            self.wrap(bits)
        }
    }

    pub fn release(&mut self, v: Vector) {
        assert!(
            self.stats.released < self.stats.acquired,
            "vector released more often than acquired"
        );
        self.stats.released += 1;
        if let Repr::Symbolic(bits) = v.into_repr() {
            self.recycle(bits);
        }
    }

    pub fn release_all(&mut self, vs: impl IntoIterator<Item = Vector>) {
        for v in vs {
            self.release(v);
        }
    }

    /// Constant of any width; zero-extended beyond 64 bits
    pub fn constant(&mut self, width: usize, value: u64) -> Vector {
        self.constant_u128(width, value as u128)
    }

    pub fn constant_u128(&mut self, width: usize, value: u128) -> Vector {
        self.stats.acquired += 1;
        if width <= WORD_BITS {
            return Vector::from_word(width, value as u64);
        }
        let mut bits = self.bits(width);
        for (i, bit) in bits.iter_mut().enumerate().take(128) {
            *bit = Lit::constant((value >> i) & 1 == 1);
        }
        Vector::from_lits(bits)
    }

    /// Turn a literal buffer into a counted vector, demoting to a word when
    /// every bit is constant
    pub fn wrap(&mut self, bits: Vec<Lit>) -> Vector {
        let width = bits.len();
        if width <= WORD_BITS && bits.iter().all(|l| l.is_const()) {
            let value = bits
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, l)| acc | ((l.is_negated() as u64) << i));
            self.recycle(bits);
            return self.constant(width, value);
        }
        self.stats.acquired += 1;
        Vector::from_lits(bits)
    }

    /// Keep a buffer symbolic even if it is constant
    pub fn wrap_symbolic(&mut self, bits: Vec<Lit>) -> Vector {
        self.stats.acquired += 1;
        Vector::from_lits(bits)
    }

    pub fn dup(&mut self, v: &Vector) -> Vector {
        match v.repr() {
            Repr::Concrete(value) => self.constant(v.width(), *value),
            Repr::Symbolic(src) => {
                let mut bits = self.bits(v.width());
                bits.copy_from_slice(src);
                self.wrap_symbolic(bits)
            }
        }
    }

    /// The bits of `v` in a scratch buffer, promoting concrete words
    pub fn lits_of(&mut self, v: &Vector) -> Vec<Lit> {
        let mut bits = self.bits(v.width());
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = v.bit(i);
        }
        bits
    }

    /// Force a vector into per-bit literals
    pub fn promote(&mut self, v: Vector) -> Vector {
        if v.is_symbolic() {
            return v;
        }
        let bits = self.lits_of(&v);
        self.release(v);
        self.wrap_symbolic(bits)
    }

    /// Replace symbolic constant bits by a word where possible
    pub fn demote(&mut self, v: Vector) -> Vector {
        let width = v.width();
        match v.into_repr() {
            Repr::Concrete(value) => Vector::from_word(width, value),
            Repr::Symbolic(bits) => {
                self.stats.released += 1;
                self.wrap(bits)
            }
        }
    }
}
