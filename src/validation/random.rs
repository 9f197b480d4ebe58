//! Operand generation for concrete/symbolic cross-checks

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Configuration for random operand generation
#[derive(Debug, Clone)]
pub struct RandomOperandConfig {
    /// Number of random operand pairs to generate
    pub count: usize,
    /// Seed for the generator; equal seeds give equal operands
    pub seed: u64,
}

impl Default for RandomOperandConfig {
    fn default() -> Self {
        RandomOperandConfig {
            count: 32,
            seed: 0x5eed,
        }
    }
}

/// Low `width` bits of a 128-bit value
pub fn mask128(width: usize) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// Generate random operand pairs of the given width
pub fn generate_random_operands(width: usize, config: &RandomOperandConfig) -> Vec<(u128, u128)> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed ^ width as u64);
    let mask = mask128(width);
    (0..config.count)
        .map(|_| (rng.random::<u128>() & mask, rng.random::<u128>() & mask))
        .collect()
}

/// Generate edge case operand pairs: zero, one, all ones, the signed
/// extremes and alternating patterns, each against itself and the first
/// five against each other
pub fn generate_edge_case_operands(width: usize) -> Vec<(u128, u128)> {
    let mask = mask128(width);
    let sign = 1u128 << (width - 1);
    let mut edge_values: Vec<u128> = vec![
        0,
        1,
        mask,
        sign,
        sign - 1,
        0x5555_5555_5555_5555_5555_5555_5555_5555 & mask,
        0xAAAA_AAAA_AAAA_AAAA_AAAA_AAAA_AAAA_AAAA & mask,
    ];
    let mut seen = HashSet::new();
    edge_values.retain(|v| seen.insert(*v));

    let mut operands: Vec<(u128, u128)> = edge_values.iter().map(|&v| (v, v)).collect();
    let head = &edge_values[..edge_values.len().min(5)];
    for &a in head {
        for &b in head {
            if a != b {
                operands.push((a, b));
            }
        }
    }
    operands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_operands_count() {
        let config = RandomOperandConfig { count: 5, seed: 1 };
        assert_eq!(generate_random_operands(32, &config).len(), 5);
    }

    #[test]
    fn test_generate_random_operands_reproducible() {
        let config = RandomOperandConfig::default();
        assert_eq!(
            generate_random_operands(64, &config),
            generate_random_operands(64, &config)
        );
    }

    #[test]
    fn test_generate_random_operands_fit_width() {
        let config = RandomOperandConfig { count: 50, seed: 7 };
        for (a, b) in generate_random_operands(8, &config) {
            assert!(a <= 0xff && b <= 0xff);
        }
    }

    #[test]
    fn test_generate_edge_case_operands_contains_extremes() {
        let operands = generate_edge_case_operands(16);
        assert!(operands.contains(&(0, 0)));
        assert!(operands.contains(&(0xffff, 0xffff)));
        assert!(operands.contains(&(0x8000, 0x7fff)));
    }

    #[test]
    fn test_generate_edge_case_operands_single_bit() {
        let operands = generate_edge_case_operands(1);
        assert!(operands.iter().all(|&(a, b)| a <= 1 && b <= 1));
        assert!(operands.contains(&(0, 1)));
        assert!(operands.contains(&(1, 0)));
    }
}
