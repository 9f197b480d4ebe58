//! Bit-precise symbolic execution over And-Inverter Graphs
//!
//! Values are bit-vectors that stay native machine words while concrete and
//! become vectors of circuit literals once they depend on a symbolic input.
//! A [`MachineState`] ties together the circuit, a concrete and a symbolic
//! memory, a heap cursor and the path condition, and forks execution on
//! branches whose condition is not decided.

pub mod circuit;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod memory;
pub mod ops;
pub mod scenarios;
pub mod validation;
pub mod vector;

pub use circuit::{Circuit, Lit, ProbeId};
pub use config::{EngineConfig, Endian, PoolConfig, SweepConfig};
pub use context::Context;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use engine::{BranchState, Continuation, LeakReport, MachineState, Memories};
pub use error::{Error, Result};
pub use vector::{Vector, VectorPool};
