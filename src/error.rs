//! Error types for recoverable failures
//!
//! Calling-model defects (width mismatches, out-of-bounds concrete accesses,
//! double releases) panic instead; they are never surfaced as `Error`.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("circuit export failed: {0}")]
    Export(String),

    #[error("circuit sweep failed: {0}")]
    Sweep(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
