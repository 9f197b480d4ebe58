//! Incremental SAT oracle over the AIG
//!
//! Nodes are Tseitin-encoded lazily: before each query every node created
//! since the previous query is added to the solver. Path conditions are
//! passed as assumptions, so the clause database never has to shrink while
//! the graph only grows. A sweep renumbers the graph, after which the oracle
//! is rebuilt from scratch.

use super::aig::{Aig, Node};
use super::lit::Lit;
use std::fmt;
use varisat::{ExtendFormula, Lit as SatLit, Solver, Var as SatVar};

/// SAT solver bound to one AIG
pub struct SatOracle {
    solver: Solver<'static>,
    encoded: usize,
    queries: u64,
}

impl fmt::Debug for SatOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatOracle")
            .field("encoded", &self.encoded)
            .field("queries", &self.queries)
            .finish()
    }
}

impl Default for SatOracle {
    fn default() -> Self {
        Self::new()
    }
}

fn sat_lit(lit: Lit) -> SatLit {
    let var = SatVar::from_index(lit.var() as usize);
    if lit.is_negated() {
        SatLit::negative(var)
    } else {
        SatLit::positive(var)
    }
}

impl SatOracle {
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            encoded: 0,
            queries: 0,
        }
    }

    /// Drop all clauses; the next query re-encodes the graph
    pub fn reset(&mut self) {
        self.solver = Solver::new();
        self.encoded = 0;
    }

    pub fn queries(&self) -> u64 {
        self.queries
    }

    fn sync(&mut self, aig: &Aig) {
        for index in self.encoded..aig.node_count() {
            let out = SatVar::from_index(index);
            match aig.node(index as u32) {
                Node::Const => self.solver.add_clause(&[SatLit::negative(out)]),
                Node::Input(_) => {}
                Node::And(a, b) => {
                    let (a, b) = (sat_lit(a), sat_lit(b));
                    let out_pos = SatLit::positive(out);
                    let out_neg = SatLit::negative(out);
                    // out -> a, out -> b, (a & b) -> out
                    self.solver.add_clause(&[out_neg, a]);
                    self.solver.add_clause(&[out_neg, b]);
                    self.solver.add_clause(&[!a, !b, out_pos]);
                }
            }
        }
        self.encoded = aig.node_count();
    }

    /// Satisfiability of the graph with `assumptions` forced true.
    ///
    /// `None` when the solver gives up.
    pub fn solve(&mut self, aig: &Aig, assumptions: &[Lit]) -> Option<bool> {
        self.sync(aig);
        self.queries += 1;
        let lits: Vec<SatLit> = assumptions.iter().copied().map(sat_lit).collect();
        self.solver.assume(&lits);
        match self.solver.solve() {
            Ok(sat) => Some(sat),
            Err(err) => {
                tracing::warn!("SAT query abandoned: {}", err);
                None
            }
        }
    }

    /// Input values of the last satisfying assignment, in input order
    pub fn model_inputs(&self, aig: &Aig) -> Option<Vec<bool>> {
        let model = self.solver.model()?;
        let mut values = vec![false; aig.node_count()];
        for lit in model {
            let index = lit.var().index();
            if index < values.len() {
                values[index] = lit.is_positive();
            }
        }
        Some(aig.inputs().iter().map(|&v| values[v as usize]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_is_satisfiable() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let ab = aig.and(a, b);
        let mut oracle = SatOracle::new();
        assert_eq!(oracle.solve(&aig, &[ab]), Some(true));
        let model = oracle.model_inputs(&aig).unwrap();
        assert_eq!(model, vec![true, true]);
    }

    #[test]
    fn test_contradiction_is_unsat() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let ab = aig.and(a, b);
        let mut oracle = SatOracle::new();
        assert_eq!(oracle.solve(&aig, &[ab, !a]), Some(false));
        // Assumptions do not stick between queries
        assert_eq!(oracle.solve(&aig, &[!a]), Some(true));
    }

    #[test]
    fn test_incremental_growth() {
        let mut aig = Aig::new();
        let a = aig.add_input("a");
        let b = aig.add_input("b");
        let mut oracle = SatOracle::new();
        assert_eq!(oracle.solve(&aig, &[a]), Some(true));
        let x = aig.xor(a, b);
        let y = aig.xnor(a, b);
        let both = aig.and(x, y);
        assert_eq!(oracle.solve(&aig, &[both]), Some(false));
    }

    #[test]
    fn test_constant_node_is_false() {
        let aig = Aig::new();
        let mut oracle = SatOracle::new();
        assert_eq!(oracle.solve(&aig, &[Lit::TRUE]), Some(true));
        assert_eq!(oracle.solve(&aig, &[Lit::FALSE]), Some(false));
    }
}
