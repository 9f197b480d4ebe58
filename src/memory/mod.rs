//! Concrete and symbolic memory models

pub mod concrete;
pub mod symbolic;

pub use concrete::{Cell, ConcreteMemory};
pub use symbolic::{NodeId, SymMemory, SymbolicStore};
