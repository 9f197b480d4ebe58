//! Engine configuration

use crate::error::{Error, Result};

/// Byte order for multi-byte memory accesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endian::Little => write!(f, "little"),
            Endian::Big => write!(f, "big"),
        }
    }
}

impl std::str::FromStr for Endian {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "little" | "le" => Ok(Endian::Little),
            "big" | "be" => Ok(Endian::Big),
            _ => Err(format!(
                "Unknown byte order: '{}'. Valid options: little, big",
                s
            )),
        }
    }
}

/// Vector pool growth policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Buffers added to a bucket each time it runs dry
    pub batch: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { batch: 100 }
    }
}

/// Circuit minimization settings used by the garbage collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Merge functionally equivalent nodes proven by SAT
    pub fraig: bool,
    /// 64-pattern simulation words per input used to find merge candidates
    pub sim_words: usize,
    /// Upper bound on SAT calls per sweep
    pub sat_limit: usize,
    /// Seed for the simulation patterns
    pub seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            fraig: true,
            sim_words: 4,
            sat_limit: 500,
            seed: 0x5eed,
        }
    }
}

impl SweepConfig {
    /// Structural rebuild only, no SAT merging
    pub fn structural() -> Self {
        Self {
            fraig: false,
            ..Self::default()
        }
    }
}

/// Configuration for a machine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Nesting budget for forked branches
    pub fork_depth: usize,
    /// Node count that triggers the first collection
    pub gc_threshold: usize,
    /// Headroom added to the node count after each collection
    pub gc_increment: usize,
    /// Drop an exact duplicate address from the current log on every store
    pub auto_compress: bool,
    /// Settle symbolic-memory address comparisons with the SAT oracle
    pub sat_strengthened_loads: bool,
    pub pool: PoolConfig,
    pub sweep: SweepConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fork_depth: 20,
            gc_threshold: 1000,
            gc_increment: 1000,
            auto_compress: true,
            sat_strengthened_loads: false,
            pool: PoolConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_fork_depth(mut self, depth: usize) -> Self {
        self.fork_depth = depth;
        self
    }

    pub fn with_gc(mut self, threshold: usize, increment: usize) -> Self {
        self.gc_threshold = threshold;
        self.gc_increment = increment;
        self
    }

    pub fn with_auto_compress(mut self, enabled: bool) -> Self {
        self.auto_compress = enabled;
        self
    }

    pub fn with_sat_strengthened_loads(mut self, enabled: bool) -> Self {
        self.sat_strengthened_loads = enabled;
        self
    }

    pub fn with_pool_batch(mut self, batch: usize) -> Self {
        self.pool.batch = batch;
        self
    }

    pub fn with_sweep(mut self, sweep: SweepConfig) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.gc_increment == 0 {
            return Err(Error::InvalidConfig(
                "gc_increment must be positive".to_string(),
            ));
        }
        if self.pool.batch == 0 {
            return Err(Error::InvalidConfig(
                "pool batch must be positive".to_string(),
            ));
        }
        if self.sweep.fraig && self.sweep.sim_words == 0 {
            return Err(Error::InvalidConfig(
                "fraiging needs at least one simulation word".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fork_depth, 20);
        assert_eq!(config.gc_threshold, 1000);
        assert_eq!(config.gc_increment, 1000);
        assert!(config.auto_compress);
        assert!(!config.sat_strengthened_loads);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_fork_depth(3)
            .with_gc(10, 5)
            .with_sweep(SweepConfig::structural());
        assert_eq!(config.fork_depth, 3);
        assert_eq!(config.gc_threshold, 10);
        assert!(!config.sweep.fraig);
    }

    #[test]
    fn test_validate_rejects_zero_increment() {
        let config = EngineConfig::default().with_gc(10, 0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        let config = EngineConfig::default().with_pool_batch(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endian_from_str() {
        assert_eq!("LE".parse::<Endian>().unwrap(), Endian::Little);
        assert_eq!("big".parse::<Endian>().unwrap(), Endian::Big);
        assert!("middle".parse::<Endian>().is_err());
        assert_eq!(Endian::Big.to_string(), "big");
    }
}
