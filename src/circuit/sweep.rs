//! Root-restricted circuit minimization
//!
//! A sweep keeps only the transitive fan-in of its roots and rebuilds it into
//! a fresh graph through structural hashing. With fraiging enabled, random
//! simulation groups nodes by signature and the SAT oracle proves candidate
//! equivalences (or constants) before they are merged.

use super::aig::{Aig, Node};
use super::lit::Lit;
use super::sat::SatOracle;
use crate::config::SweepConfig;
use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Statistics of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub merged: usize,
    pub sat_calls: usize,
}

/// Old-variable to new-literal translation produced by a sweep
#[derive(Debug, Clone)]
pub struct Remap {
    map: Vec<Option<Lit>>,
}

impl Remap {
    pub fn apply(&self, lit: Lit) -> Result<Lit> {
        match self.map.get(lit.var() as usize) {
            Some(Some(new)) => Ok(new.negate_if(lit.is_negated())),
            _ => Err(Error::Sweep(format!("{} is outside the swept cone", lit))),
        }
    }

    /// `next` after `self`. Nodes the second pass dropped (merged away, so
    /// no longer in the cone of any root) fall out of the composed map.
    fn compose(&self, next: &Remap) -> Remap {
        let map = self
            .map
            .iter()
            .map(|entry| entry.and_then(|lit| next.apply(lit).ok()))
            .collect();
        Remap { map }
    }
}

/// Rebuild the cone of `roots` into a fresh graph
pub fn sweep(aig: &Aig, roots: &[Lit], config: &SweepConfig) -> Result<(Aig, Remap, SweepReport)> {
    if let Some(bad) = roots.iter().find(|l| l.var() as usize >= aig.node_count()) {
        return Err(Error::Sweep(format!("root {} is not a node", bad)));
    }
    let mut report = SweepReport {
        nodes_before: aig.node_count(),
        ..SweepReport::default()
    };

    let (fresh, remap) = if config.fraig {
        let (merged_graph, remap) = fraig(aig, roots, config, &mut report)?;
        if report.merged == 0 {
            (merged_graph, remap)
        } else {
            // Merging leaves the replaced nodes dangling; compact once more
            let new_roots = roots
                .iter()
                .map(|&l| remap.apply(l))
                .collect::<Result<Vec<_>>>()?;
            let (compact, second) = rebuild(&merged_graph, &new_roots);
            (compact, remap.compose(&second))
        }
    } else {
        rebuild(aig, roots)
    };

    report.nodes_after = fresh.node_count();
    Ok((fresh, remap, report))
}

fn fresh_with_inputs(aig: &Aig, map: &mut [Option<Lit>]) -> Aig {
    let mut fresh = Aig::new();
    map[0] = Some(Lit::FALSE);
    for (index, &var) in aig.inputs().iter().enumerate() {
        map[var as usize] = Some(fresh.add_input(aig.input_name(index)));
    }
    fresh
}

fn mapped(map: &[Option<Lit>], lit: Lit) -> Lit {
    match map[lit.var() as usize] {
        Some(new) => new.negate_if(lit.is_negated()),
        None => unreachable!("fan-in of a cone node is in the cone"),
    }
}

/// Plain structural rebuild of the cone
fn rebuild(aig: &Aig, roots: &[Lit]) -> (Aig, Remap) {
    let marked = aig.cone(roots.iter().copied());
    let mut map = vec![None; aig.node_count()];
    let mut fresh = fresh_with_inputs(aig, &mut map);
    for var in 0..aig.node_count() {
        if !marked[var] {
            continue;
        }
        if let Node::And(a, b) = aig.node(var as u32) {
            let (a, b) = (mapped(&map, a), mapped(&map, b));
            map[var] = Some(fresh.and(a, b));
        }
    }
    (fresh, Remap { map })
}

fn signatures(aig: &Aig, config: &SweepConfig) -> Vec<Vec<u64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut sigs = vec![Vec::with_capacity(config.sim_words); aig.node_count()];
    for _ in 0..config.sim_words {
        let words: Vec<u64> = (0..aig.input_count()).map(|_| rng.random()).collect();
        let values = aig.simulate(&words);
        for (sig, value) in sigs.iter_mut().zip(values) {
            sig.push(value);
        }
    }
    sigs
}

/// Rebuild with SAT-proven merging of simulation-equivalent nodes
fn fraig(
    aig: &Aig,
    roots: &[Lit],
    config: &SweepConfig,
    report: &mut SweepReport,
) -> Result<(Aig, Remap)> {
    let marked = aig.cone(roots.iter().copied());
    let sigs = signatures(aig, config);
    let mut map = vec![None; aig.node_count()];
    let mut fresh = fresh_with_inputs(aig, &mut map);
    let mut oracle = SatOracle::new();
    // Signature normalized to a cleared first bit, with the phase that got it there
    let mut classes: HashMap<Vec<u64>, Lit> = HashMap::new();

    for &var in aig.inputs() {
        let lit = Lit::new(var, false);
        let (sig, phase) = normalized(&sigs[var as usize]);
        classes
            .entry(sig)
            .or_insert_with(|| mapped(&map, lit).negate_if(phase));
    }

    for var in 0..aig.node_count() {
        if !marked[var] {
            continue;
        }
        let Node::And(a, b) = aig.node(var as u32) else {
            continue;
        };
        let candidate = fresh.and(mapped(&map, a), mapped(&map, b));
        map[var] = Some(candidate);
        if candidate.is_const() {
            continue;
        }

        let node_sig = &sigs[var];
        if node_sig.iter().all(|&w| w == 0) || node_sig.iter().all(|&w| w == u64::MAX) {
            let value = node_sig[0] != 0;
            if report.sat_calls < config.sat_limit {
                report.sat_calls += 1;
                // The node is constant iff it can never take the other value
                let target = candidate.negate_if(value);
                if oracle.solve(&fresh, &[target]) == Some(false) {
                    map[var] = Some(Lit::constant(value));
                    report.merged += 1;
                    continue;
                }
            }
        }

        let (key, phase) = normalized(node_sig);
        match classes.get(&key) {
            Some(&rep) => {
                let rep = rep.negate_if(phase);
                if rep == candidate || report.sat_calls + 2 > config.sat_limit {
                    continue;
                }
                report.sat_calls += 2;
                let differs_one_way = oracle.solve(&fresh, &[candidate, !rep]);
                if differs_one_way != Some(false) {
                    continue;
                }
                if oracle.solve(&fresh, &[!candidate, rep]) == Some(false) {
                    map[var] = Some(rep);
                    report.merged += 1;
                }
            }
            None => {
                classes.insert(key, candidate.negate_if(phase));
            }
        }
    }
    Ok((fresh, Remap { map }))
}

fn normalized(sig: &[u64]) -> (Vec<u64>, bool) {
    let phase = sig.first().is_some_and(|w| w & 1 == 1);
    let key = if phase {
        sig.iter().map(|w| !w).collect()
    } else {
        sig.to_vec()
    };
    (key, phase)
}
