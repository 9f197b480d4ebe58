//! Non-fatal events raised while executing

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Concrete,
    Symbolic,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Concrete => write!(f, "concrete"),
            MemoryKind::Symbolic => write!(f, "symbolic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A byte was loaded before anything was stored to it; zero was used
    ReadBeforeWrite { memory: MemoryKind, address: String },
    /// A fork was refused because the nesting budget ran out
    ForkBudgetExhausted { depth: usize },
    /// A resource was still live at teardown
    Leak { resource: &'static str, count: u64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ReadBeforeWrite { memory, address } => {
                write!(f, "read-before-write in {} memory at {}", memory, address)
            }
            Diagnostic::ForkBudgetExhausted { depth } => {
                write!(f, "fork budget exhausted at depth {}", depth)
            }
            Diagnostic::Leak { resource, count } => {
                write!(f, "{} {} leaked", count, resource)
            }
        }
    }
}

/// Log of diagnostics, also forwarded to `tracing`
#[derive(Debug, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.events.push(diagnostic);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn read_before_write_count(&self) -> usize {
        self.events
            .iter()
            .filter(|d| matches!(d, Diagnostic::ReadBeforeWrite { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_read_before_write() {
        let mut diags = Diagnostics::new();
        diags.record(Diagnostic::ReadBeforeWrite {
            memory: MemoryKind::Concrete,
            address: "0x10".to_string(),
        });
        diags.record(Diagnostic::Leak {
            resource: "vectors",
            count: 2,
        });
        assert_eq!(diags.read_before_write_count(), 1);
        assert_eq!(diags.events().len(), 2);
        assert_eq!(diags.events()[1].to_string(), "2 vectors leaked");
        diags.clear();
        assert!(diags.events().is_empty());
    }
}
