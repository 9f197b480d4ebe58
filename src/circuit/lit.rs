//! Literals: signed references to circuit nodes

use std::fmt;
use std::ops::Not;

/// Index of a node in the And-Inverter Graph. Node 0 is the constant.
pub type Var = u32;

/// A reference to a circuit node with a polarity bit.
///
/// Encoded the AIGER way: `var * 2 + negated`. `Lit::FALSE` is the constant
/// node, `Lit::TRUE` its complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Lit(pub(crate) u32);

impl Lit {
    pub const FALSE: Lit = Lit(0);
    pub const TRUE: Lit = Lit(1);

    pub fn new(var: Var, negated: bool) -> Self {
        Lit((var << 1) | negated as u32)
    }

    /// Literal for a boolean constant
    pub fn constant(value: bool) -> Self {
        if value {
            Lit::TRUE
        } else {
            Lit::FALSE
        }
    }

    pub fn var(self) -> Var {
        self.0 >> 1
    }

    pub fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    pub fn is_const(self) -> bool {
        self.var() == 0
    }

    /// The boolean value if this literal is one of the two constants
    pub fn const_value(self) -> Option<bool> {
        if self.is_const() {
            Some(self.is_negated())
        } else {
            None
        }
    }

    /// Complement when `flip` is set
    pub fn negate_if(self, flip: bool) -> Self {
        Lit(self.0 ^ flip as u32)
    }

    /// Positive-polarity literal of the same node
    pub fn regular(self) -> Self {
        Lit(self.0 & !1)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.const_value() {
            Some(true) => write!(f, "1"),
            Some(false) => write!(f, "0"),
            None if self.is_negated() => write!(f, "!n{}", self.var()),
            None => write!(f, "n{}", self.var()),
        }
    }
}
