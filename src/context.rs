//! Shared execution context handed to every operation

use crate::circuit::{Circuit, Lit};
use crate::config::PoolConfig;
use crate::diagnostics::Diagnostics;
use crate::vector::{Vector, VectorPool};

/// The circuit, the vector pool and the diagnostic log of one analysis.
///
/// Only one context may drive a circuit at a time; independent analyses
/// each own their own.
#[derive(Debug, Default)]
pub struct Context {
    pub circuit: Circuit,
    pub pool: VectorPool,
    pub diagnostics: Diagnostics,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(config: &PoolConfig) -> Self {
        Self {
            circuit: Circuit::new(),
            pool: VectorPool::new(config),
            diagnostics: Diagnostics::new(),
        }
    }

    /// A vector of fresh named circuit inputs, `name[0]` least significant
    pub fn new_symbolic(&mut self, name: &str, width: usize) -> Vector {
        let mut bits = self.pool.bits(width);
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = self.circuit.new_input(format!("{}[{}]", name, i));
        }
        self.pool.wrap(bits)
    }

    pub fn constant(&mut self, width: usize, value: u64) -> Vector {
        self.pool.constant(width, value)
    }

    pub fn dup(&mut self, v: &Vector) -> Vector {
        self.pool.dup(v)
    }

    pub fn release(&mut self, v: Vector) {
        self.pool.release(v)
    }

    /// Scratch literal buffer holding the bits of `v`
    pub fn bits_of(&mut self, v: &Vector) -> Vec<Lit> {
        self.pool.lits_of(v)
    }

    /// Wrap a finished literal buffer, demoting it if it is constant
    pub fn finish(&mut self, bits: Vec<Lit>) -> Vector {
        self.pool.wrap(bits)
    }

    pub fn recycle(&mut self, bits: Vec<Lit>) {
        self.pool.recycle(bits)
    }

    /// Strengthen a literal to a constant when the SAT oracle can prove one
    /// under the current path condition
    pub fn settle(&mut self, lit: Lit) -> Lit {
        if lit.is_const() {
            return lit;
        }
        if self.circuit.is_provably_constant(lit, false) {
            return Lit::FALSE;
        }
        if self.circuit.is_provably_constant(lit, true) {
            return Lit::TRUE;
        }
        lit
    }
}
