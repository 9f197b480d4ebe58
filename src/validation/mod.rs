//! Validation utilities for checking the operation library

pub mod equivalence;
pub mod random;

pub use equivalence::{check, check_width, CheckConfig, EquivalenceReport, Mismatch, Op};
pub use random::{generate_edge_case_operands, generate_random_operands, RandomOperandConfig};
